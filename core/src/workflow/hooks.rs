// conveyor/src/workflow/hooks.rs

//! Registration of `before`, `on` and `after` handlers.
//!
//! User handlers may fail with any error type convertible into the workflow's `E`.

use crate::core::handler::{Handler, HandlerFuture};
use crate::core::shared::Shared;
use crate::core::control::Flow;
use crate::error::FlowError;
use crate::workflow::definition::Workflow;
use std::collections::HashMap;
use std::future::Future;

#[derive(Clone, Copy)]
enum Phase {
  Before,
  On,
  After,
}

impl<T, E> Workflow<T, E>
where
  T: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub fn before<F, UserErr>(&mut self, step_name: &str, handler_fn: impl Fn(Shared<T>) -> F + Send + Sync + 'static)
  where
    F: Future<Output = Result<Flow, UserErr>> + Send + 'static,
    UserErr: Into<E> + Send + Sync + 'static,
  {
    self.push_handler(Phase::Before, step_name, handler_fn);
  }

  pub fn on<F, UserErr>(&mut self, step_name: &str, handler_fn: impl Fn(Shared<T>) -> F + Send + Sync + 'static)
  where
    F: Future<Output = Result<Flow, UserErr>> + Send + 'static,
    UserErr: Into<E> + Send + Sync + 'static,
  {
    self.push_handler(Phase::On, step_name, handler_fn);
  }

  pub fn after<F, UserErr>(&mut self, step_name: &str, handler_fn: impl Fn(Shared<T>) -> F + Send + Sync + 'static)
  where
    F: Future<Output = Result<Flow, UserErr>> + Send + 'static,
    UserErr: Into<E> + Send + Sync + 'static,
  {
    self.push_handler(Phase::After, step_name, handler_fn);
  }

  /// Registers an already boxed handler, e.g. one built by a helper shared between workflows.
  pub fn on_boxed(&mut self, step_name: &str, handler: Handler<T, E>) {
    self.ensure_step_exists(step_name);
    self.on.entry(step_name.to_string()).or_default().push(handler);
  }

  fn push_handler<F, UserErr>(
    &mut self,
    phase: Phase,
    step_name: &str,
    handler_fn: impl Fn(Shared<T>) -> F + Send + Sync + 'static,
  ) where
    F: Future<Output = Result<Flow, UserErr>> + Send + 'static,
    UserErr: Into<E> + Send + Sync + 'static,
  {
    self.ensure_step_exists(step_name);
    let handler: Handler<T, E> = Box::new(move |ctx| {
      let fut = handler_fn(ctx);
      Box::pin(async move { fut.await.map_err(Into::into) }) as HandlerFuture<E>
    });
    let table: &mut HashMap<String, Vec<Handler<T, E>>> = match phase {
      Phase::Before => &mut self.before,
      Phase::On => &mut self.on,
      Phase::After => &mut self.after,
    };
    table.entry(step_name.to_string()).or_default().push(handler);
  }
}
