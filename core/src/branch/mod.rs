// conveyor/src/branch/mod.rs

//! Branch steps: a step whose work is delegated to one of several
//! sub-workflows, picked by predicates over the root context.
//!
//! Each route pairs a predicate, a sub-workflow over its own context type `S`,
//! and a projection that produces the `Shared<S>` the sub-workflow runs on.
//! Projections usually hand out a `Shared<S>` stored inside the root context so
//! the root workflow can read the sub-run's results afterwards.

pub mod builder;
pub mod route;

pub use builder::BranchBuilder;
