// conveyor/src/registry.rs

//! `Registry<E>`: workflows keyed by the type of their root context.
//!
//! Request handlers only need to build a `Shared<T>` and call `run`; the
//! registry finds the workflow registered for `T`.

use crate::core::control::Outcome;
use crate::core::shared::Shared;
use crate::error::FlowError;
use crate::workflow::Workflow;

use async_trait::async_trait;
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{event, Level};

#[async_trait]
trait ErasedWorkflow<E>: Send + Sync
where
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  fn name(&self) -> &str;

  /// `ctx` must be a boxed `Shared<T>` for the registered `T`.
  async fn run_erased(&self, ctx: Box<dyn Any + Send>) -> Result<Outcome, E>;
}

#[async_trait]
impl<T, E> ErasedWorkflow<E> for Workflow<T, E>
where
  T: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  fn name(&self) -> &str {
    Workflow::name(self)
  }

  async fn run_erased(&self, ctx: Box<dyn Any + Send>) -> Result<Outcome, E> {
    let typed = ctx.downcast::<Shared<T>>().map_err(|_| {
      E::from(FlowError::TypeMismatch {
        location: format!("registry dispatch to '{}'", self.name),
        expected_type: std::any::type_name::<Shared<T>>().to_string(),
      })
    })?;
    self.run(*typed).await
  }
}

pub struct Registry<E = FlowError>
where
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  workflows: RwLock<HashMap<TypeId, Arc<dyn ErasedWorkflow<E>>>>,
}

impl<E> Registry<E>
where
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub fn new() -> Self {
    Self {
      workflows: RwLock::new(HashMap::new()),
    }
  }

  /// Registers `workflow` for its context type `T`, replacing any earlier one.
  pub fn register<T>(&self, workflow: Workflow<T, E>)
  where
    T: 'static + Send + Sync,
  {
    event!(
      Level::DEBUG,
      workflow = %workflow.name(),
      context_type = %std::any::type_name::<T>(),
      "Registering workflow."
    );
    let previous = self.workflows.write().insert(TypeId::of::<T>(), Arc::new(workflow));
    if let Some(previous) = previous {
      event!(Level::WARN, replaced = %previous.name(), "Workflow replaced an earlier registration.");
    }
  }

  pub fn is_registered<T: 'static>(&self) -> bool {
    self.workflows.read().contains_key(&TypeId::of::<T>())
  }

  pub fn len(&self) -> usize {
    self.workflows.read().len()
  }

  pub fn is_empty(&self) -> bool {
    self.workflows.read().is_empty()
  }

  /// Runs the workflow registered for `T`.
  pub async fn run<T>(&self, ctx: Shared<T>) -> Result<Outcome, E>
  where
    T: 'static + Send + Sync,
  {
    let workflow = self.workflows.read().get(&TypeId::of::<T>()).cloned();
    let Some(workflow) = workflow else {
      let type_name = std::any::type_name::<T>();
      event!(Level::ERROR, context_type = %type_name, "No workflow registered.");
      return Err(E::from(FlowError::Unregistered {
        type_name: type_name.to_string(),
      }));
    };
    workflow.run_erased(Box::new(ctx)).await
  }
}

impl<E> Default for Registry<E>
where
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  fn default() -> Self {
    Self::new()
  }
}
