// bazaar/src/pipelines/mod.rs

//! Multi-step request flows, expressed as `conveyor` workflows and
//! registered once at startup.

use crate::errors::AppError;
use conveyor::Registry;

pub mod contexts;
pub mod payment_flows;

pub mod cart_pipeline;
pub mod checkout_pipeline;
pub mod signin_pipeline;
pub mod signup_pipeline;
pub mod webhook_pipeline;

pub fn register_all_pipelines(registry: &Registry<AppError>) {
  tracing::info!("Registering workflows...");

  signup_pipeline::register_signup_pipeline(registry);
  signin_pipeline::register_signin_pipeline(registry);
  cart_pipeline::register_add_to_cart_pipeline(registry);
  checkout_pipeline::register_checkout_pipeline(registry);
  webhook_pipeline::register_payment_webhook_pipeline(registry);

  tracing::info!(count = registry.len(), "All workflows registered.");
}
