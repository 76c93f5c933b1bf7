// bazaar/src/lib.rs

//! Bazaar: a multi-role marketplace API (customers, vendors, admins and
//! delivery agents). The binary in `main.rs` only wires configuration,
//! storage and the HTTP server around this library.

pub mod config;
pub mod errors;
pub mod models;
pub mod pipelines;
pub mod services;
pub mod state;
pub mod store;
pub mod web;

pub use crate::config::AppConfig;
pub use crate::errors::{AppError, Result};
pub use crate::state::AppState;
