// conveyor/src/workflow/definition.rs

//! `Workflow<T, E>` and its construction.

use crate::branch::BranchBuilder;
use crate::core::handler::Handler;
use crate::core::step::StepSpec;
use crate::error::FlowError;
use std::collections::HashMap;

/// An ordered set of named steps over a context `T`, whose handlers fail with `E`.
///
/// `E` must be constructible from [`FlowError`] so that engine-level failures
/// (a required step without handlers, a failed projection) surface through the
/// same error type the handlers use.
pub struct Workflow<T, E>
where
  T: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub(crate) name: String,
  pub(crate) steps: Vec<StepSpec<T>>,
  pub(crate) before: HashMap<String, Vec<Handler<T, E>>>,
  pub(crate) on: HashMap<String, Vec<Handler<T, E>>>,
  pub(crate) after: HashMap<String, Vec<Handler<T, E>>>,
}

impl<T, E> Workflow<T, E>
where
  T: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Creates a workflow from its step list. Step names must be unique.
  pub fn new(name: impl Into<String>, steps: impl IntoIterator<Item = StepSpec<T>>) -> Self {
    let steps: Vec<StepSpec<T>> = steps.into_iter().collect();
    for (idx, step) in steps.iter().enumerate() {
      if steps[..idx].iter().any(|s| s.name == step.name) {
        panic!("Workflow setup error: step '{}' is declared twice.", step.name);
      }
    }

    Self {
      name: name.into(),
      steps,
      before: HashMap::new(),
      on: HashMap::new(),
      after: HashMap::new(),
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  /// Step names in execution order.
  pub fn step_names(&self) -> Vec<&str> {
    self.steps.iter().map(|s| s.name.as_str()).collect()
  }

  /// Panics on unknown step names. A typo in a step name is a wiring bug, not a
  /// runtime condition.
  pub(crate) fn ensure_step_exists(&self, step_name: &str) {
    if !self.steps.iter().any(|s| s.name == step_name) {
      panic!(
        "Workflow setup error: step '{}' not found in workflow '{}'.",
        step_name, self.name
      );
    }
  }

  pub(crate) fn step_is_optional(&self, step_name: &str) -> bool {
    self.steps.iter().any(|s| s.name == step_name && s.optional)
  }

  /// Turns `step_name` into a branch step. See [`BranchBuilder`].
  pub fn branch(&mut self, step_name: &str) -> BranchBuilder<'_, T, E> {
    self.ensure_step_exists(step_name);
    BranchBuilder::new(self, step_name.to_string())
  }
}
