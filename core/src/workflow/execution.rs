// conveyor/src/workflow/execution.rs

//! `Workflow::run`: walks the steps in order and drives their handlers.

use crate::core::control::{Flow, Outcome};
use crate::core::handler::Handler;
use crate::core::shared::Shared;
use crate::core::step::StepSpec;
use crate::error::FlowError;
use crate::workflow::definition::Workflow;
use tracing::{event, info_span, Instrument, Level};

impl<T, E> Workflow<T, E>
where
  T: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Runs every step against `ctx`.
  ///
  /// - A step whose `skip_if` matches is skipped entirely.
  /// - A required step without any handler fails with [`FlowError::HandlerMissing`].
  /// - `before`, `on`, `after` handlers run in that order; the first `Halt`
  ///   ends the run with [`Outcome::Halted`].
  /// - A handler error ends the run, unless the step is optional, in which
  ///   case the error is logged and the run moves on to the next step.
  pub async fn run(&self, ctx: Shared<T>) -> Result<Outcome, E> {
    let span = info_span!(
      "workflow_run",
      workflow = %self.name,
      context_type = %std::any::type_name::<T>(),
      num_steps = self.steps.len(),
    );
    self.run_steps(ctx).instrument(span).await
  }

  async fn run_steps(&self, ctx: Shared<T>) -> Result<Outcome, E> {
    event!(Level::DEBUG, "Workflow run starting.");

    for (step_idx, step) in self.steps.iter().enumerate() {
      let step_span = info_span!(
        "workflow_step",
        step = %step.name,
        step_index = step_idx,
        optional = step.optional
      );
      let flow = match self.run_step(step, ctx.clone()).instrument(step_span).await {
        Ok(flow) => flow,
        Err(e) if step.optional => {
          event!(Level::WARN, step = %step.name, error = %e, "Optional step failed; continuing.");
          Flow::Continue
        }
        Err(e) => return Err(e),
      };
      if flow == Flow::Halt {
        event!(Level::INFO, step = %step.name, "Workflow halted.");
        return Ok(Outcome::Halted);
      }
    }

    event!(Level::DEBUG, "Workflow run completed.");
    Ok(Outcome::Completed)
  }

  async fn run_step(&self, step: &StepSpec<T>, ctx: Shared<T>) -> Result<Flow, E> {
    if let Some(skip_if) = &step.skip_if {
      if skip_if(ctx.clone()) {
        event!(Level::INFO, "Step skipped by its skip_if predicate.");
        return Ok(Flow::Continue);
      }
    }

    let phases: [(&str, Option<&Vec<Handler<T, E>>>); 3] = [
      ("before", self.before.get(&step.name)),
      ("on", self.on.get(&step.name)),
      ("after", self.after.get(&step.name)),
    ];

    let has_handlers = phases.iter().any(|(_, hs)| hs.is_some_and(|v| !v.is_empty()));
    if !has_handlers {
      if step.optional {
        event!(Level::DEBUG, "Optional step has no handlers, skipping.");
        return Ok(Flow::Continue);
      }
      event!(Level::ERROR, "Required step has no handlers.");
      return Err(E::from(FlowError::HandlerMissing {
        step_name: step.name.clone(),
      }));
    }

    for (phase, handlers) in phases {
      let Some(handlers) = handlers else { continue };
      for (handler_idx, handler) in handlers.iter().enumerate() {
        match handler(ctx.clone()).await {
          Ok(Flow::Continue) => {}
          Ok(Flow::Halt) => {
            event!(Level::DEBUG, phase, handler_idx, "Handler returned Halt.");
            return Ok(Flow::Halt);
          }
          Err(e) => {
            event!(Level::ERROR, phase, handler_idx, error = %e, "Handler failed.");
            return Err(e);
          }
        }
      }
    }

    Ok(Flow::Continue)
  }
}
