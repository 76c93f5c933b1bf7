// conveyor/src/error.rs
use anyhow::Error as AnyhowError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlowError {
  #[error("Handler missing for non-optional step: {step_name}")]
  HandlerMissing { step_name: String },

  #[error("Projection into sub-context failed for step '{step_name}'. Source: {source}")]
  Projection {
    step_name: String,
    #[source]
    source: AnyhowError,
  },

  #[error("No workflow registered for context type {type_name}")]
  Unregistered { type_name: String },

  #[error("Type mismatch during context downcast (expected {expected_type}, at: '{location}')")]
  TypeMismatch { location: String, expected_type: String },

  #[error("Error in handler or external operation. Source: {source}")]
  Handler {
    #[source]
    source: AnyhowError,
  },

  #[error("Internal workflow error: {0}")]
  Internal(String),
}

impl FlowError {
  /// Convenience for projections that fail with a plain message.
  pub fn projection(step_name: impl Into<String>, message: impl Into<String>) -> Self {
    FlowError::Projection {
      step_name: step_name.into(),
      source: anyhow::anyhow!(message.into()),
    }
  }
}

impl From<AnyhowError> for FlowError {
  fn from(err: AnyhowError) -> Self {
    FlowError::Handler { source: err }
  }
}

pub type FlowResult<T, E = FlowError> = std::result::Result<T, E>;
