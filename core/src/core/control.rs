// conveyor/src/core/control.rs

//! Flow signals returned by handlers and the outcome of a whole run.

/// Returned by every handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
  /// Proceed with the remaining handlers and steps.
  Continue,
  /// Stop the run right here. Later handlers and steps do not execute.
  Halt,
}

/// Result of a full workflow run that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
  Completed,
  /// A handler returned [`Flow::Halt`].
  Halted,
}

impl Outcome {
  pub fn is_completed(self) -> bool {
    matches!(self, Outcome::Completed)
  }
}
