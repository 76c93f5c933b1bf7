// conveyor/src/lib.rs

//! Conveyor: small async workflows made of named steps.
//!
//! A [`Workflow`] is an ordered list of steps operating on a shared, lockable
//! context ([`Shared<T>`]). Each step can carry:
//!  - `before`, `on` and `after` handlers, run in that order;
//!  - an `optional` flag and a `skip_if` predicate;
//!  - a set of branch routes that hand a projected sub-context to a
//!    sub-workflow when their predicate matches.
//!
//! Handlers return [`Flow::Continue`] or [`Flow::Halt`]. A [`Registry`] keyed by
//! context type lets request handlers run a workflow without holding it directly.

pub mod branch;
pub mod core;
pub mod error;
pub mod registry;
pub mod workflow;

pub use crate::branch::BranchBuilder;
pub use crate::core::control::{Flow, Outcome};
pub use crate::core::handler::Handler;
pub use crate::core::shared::Shared;
pub use crate::core::step::{SkipIf, StepSpec};
pub use crate::error::{FlowError, FlowResult};
pub use crate::registry::Registry;
pub use crate::workflow::Workflow;
