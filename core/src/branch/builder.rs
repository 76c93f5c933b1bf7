// conveyor/src/branch/builder.rs

//! Fluent builder returned by [`Workflow::branch`].
//!
//! ```ignore
//! checkout.branch("initiate_payment")
//!   .route("cod", |ctx| ctx.read().is_cod(), cod_flow, |ctx| Ok(ctx.read().payment.clone()))
//!   .route("online", |ctx| !ctx.read().is_cod(), online_flow, |ctx| Ok(ctx.read().payment.clone()))
//!   .otherwise(Flow::Halt)
//!   .finish();
//! ```

use crate::branch::route::{AnyRoute, Route};
use crate::core::control::Flow;
use crate::core::handler::{Handler, HandlerFuture};
use crate::core::shared::Shared;
use crate::error::FlowError;
use crate::workflow::Workflow;
use std::sync::Arc;
use tracing::{event, Level};

pub struct BranchBuilder<'w, T, E>
where
  T: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  workflow: &'w mut Workflow<T, E>,
  step_name: String,
  routes: Vec<Arc<dyn AnyRoute<T, E>>>,
  fallback: Flow,
}

impl<'w, T, E> BranchBuilder<'w, T, E>
where
  T: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub(crate) fn new(workflow: &'w mut Workflow<T, E>, step_name: String) -> Self {
    Self {
      workflow,
      step_name,
      routes: Vec::new(),
      fallback: Flow::Continue,
    }
  }

  /// Adds a route. Routes are tried in insertion order; the first whose
  /// predicate matches runs and no other route is considered.
  pub fn route<S>(
    mut self,
    label: &str,
    predicate: impl Fn(Shared<T>) -> bool + Send + Sync + 'static,
    sub_workflow: Arc<Workflow<S, E>>,
    projection: impl Fn(Shared<T>) -> Result<Shared<S>, FlowError> + Send + Sync + 'static,
  ) -> Self
  where
    S: 'static + Send + Sync,
  {
    self.routes.push(Arc::new(Route {
      label: label.to_string(),
      predicate: Arc::new(predicate),
      workflow: sub_workflow,
      projection: Arc::new(projection),
    }));
    self
  }

  /// Flow returned when no route matches. Defaults to [`Flow::Continue`].
  pub fn otherwise(mut self, fallback: Flow) -> Self {
    self.fallback = fallback;
    self
  }

  /// Installs the branch as the step's `on` handler, replacing any `on`
  /// handlers registered earlier for that step.
  pub fn finish(self) {
    let routes = Arc::new(self.routes);
    let fallback = self.fallback;
    let step_name = self.step_name.clone();

    let dispatcher: Handler<T, E> = Box::new(move |ctx: Shared<T>| {
      let routes = routes.clone();
      let step_name = step_name.clone();
      Box::pin(async move {
        for route in routes.iter() {
          if route.matches(ctx.clone()) {
            event!(Level::DEBUG, step = %step_name, route = %route.label(), "Branch route matched.");
            return route.run(&step_name, ctx).await;
          }
        }
        event!(Level::DEBUG, step = %step_name, ?fallback, "No branch route matched.");
        Ok(fallback)
      }) as HandlerFuture<E>
    });

    let optional = self.workflow.step_is_optional(&self.step_name);
    self.workflow.on.insert(self.step_name.clone(), vec![dispatcher]);
    event!(Level::DEBUG, step = %self.step_name, optional, "Branch step installed.");
  }
}
