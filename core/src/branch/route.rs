// conveyor/src/branch/route.rs

use crate::core::control::{Flow, Outcome};
use crate::core::shared::Shared;
use crate::error::FlowError;
use crate::workflow::Workflow;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{event, instrument, Level};

pub(crate) type Predicate<T> = Arc<dyn Fn(Shared<T>) -> bool + Send + Sync + 'static>;
pub(crate) type Projection<T, S> = Arc<dyn Fn(Shared<T>) -> Result<Shared<S>, FlowError> + Send + Sync + 'static>;

/// One route of a branch step.
pub(crate) struct Route<T, S, E>
where
  T: 'static + Send + Sync,
  S: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub(crate) label: String,
  pub(crate) predicate: Predicate<T>,
  pub(crate) workflow: Arc<Workflow<S, E>>,
  pub(crate) projection: Projection<T, S>,
}

/// Erases the sub-context type so routes over different `S` can live in one list.
#[async_trait]
pub(crate) trait AnyRoute<T, E>: Send + Sync
where
  T: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  fn label(&self) -> &str;

  fn matches(&self, ctx: Shared<T>) -> bool;

  async fn run(&self, step_name: &str, ctx: Shared<T>) -> Result<Flow, E>;
}

#[async_trait]
impl<T, S, E> AnyRoute<T, E> for Route<T, S, E>
where
  T: 'static + Send + Sync,
  S: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  fn label(&self) -> &str {
    &self.label
  }

  fn matches(&self, ctx: Shared<T>) -> bool {
    (self.predicate)(ctx)
  }

  #[instrument(
    name = "branch_route",
    skip(self, ctx),
    fields(route = %self.label, sub_workflow = %self.workflow.name()),
    err(Display)
  )]
  async fn run(&self, step_name: &str, ctx: Shared<T>) -> Result<Flow, E> {
    let sub_ctx = (self.projection)(ctx).map_err(|err| {
      event!(Level::ERROR, error = %err, "Projection into sub-context failed.");
      let err = match err {
        FlowError::Projection { source, .. } | FlowError::Handler { source } => FlowError::Projection {
          step_name: step_name.to_string(),
          source,
        },
        other => other,
      };
      E::from(err)
    })?;

    match self.workflow.run(sub_ctx).await? {
      Outcome::Completed => Ok(Flow::Continue),
      Outcome::Halted => {
        event!(Level::INFO, "Sub-workflow halted; halting the parent step.");
        Ok(Flow::Halt)
      }
    }
  }
}
