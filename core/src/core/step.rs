// conveyor/src/core/step.rs

use super::Shared;
use std::sync::Arc;

/// Predicate evaluated against the context right before a step runs.
/// When it returns `true` the whole step is skipped.
pub type SkipIf<T> = Arc<dyn Fn(Shared<T>) -> bool + Send + Sync + 'static>;

/// A named step of a workflow.
#[derive(Clone)]
pub struct StepSpec<T: 'static + Send + Sync> {
  pub name: String,
  pub optional: bool,
  pub skip_if: Option<SkipIf<T>>,
}

impl<T: 'static + Send + Sync> StepSpec<T> {
  pub fn required(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      optional: false,
      skip_if: None,
    }
  }

  pub fn optional(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      optional: true,
      skip_if: None,
    }
  }

  pub fn skip_if(mut self, predicate: impl Fn(Shared<T>) -> bool + Send + Sync + 'static) -> Self {
    self.skip_if = Some(Arc::new(predicate));
    self
  }
}

// SkipIf is an Arc<dyn Fn>, so Debug is written by hand.
impl<T: 'static + Send + Sync> std::fmt::Debug for StepSpec<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("StepSpec")
      .field("name", &self.name)
      .field("optional", &self.optional)
      .field("has_skip_if", &self.skip_if.is_some())
      .finish()
  }
}
