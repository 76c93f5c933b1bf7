// bazaar/src/services/payment_gateway.rs

//! Hosted checkout sessions. The concrete provider is hidden behind
//! [`PaymentGateway`] so tests can swap in a failing one.

use crate::errors::{AppError, Result as AppResult};
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct CheckoutSessionRequest {
  pub order_id: Uuid,
  pub amount_cents: i64,
  pub currency: String,
  pub customer_email: String,
  pub success_url: String,
  pub cancel_url: String,
  /// Echoed back by the provider on webhook events.
  pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
  pub id: String,
  /// Where the customer is sent to pay.
  pub url: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
  async fn create_checkout_session(&self, request: &CheckoutSessionRequest) -> AppResult<CheckoutSession>;
}

/// Simulated hosted checkout: issues session ids locally and points the
/// customer at `{checkout_base_url}/{session_id}`.
pub struct HostedCheckoutGateway {
  checkout_base_url: String,
}

impl HostedCheckoutGateway {
  pub fn new(checkout_base_url: impl Into<String>) -> Self {
    Self {
      checkout_base_url: checkout_base_url.into().trim_end_matches('/').to_string(),
    }
  }
}

#[async_trait]
impl PaymentGateway for HostedCheckoutGateway {
  #[instrument(
    name = "payment_gateway::create_checkout_session",
    skip(self, request),
    fields(order_id = %request.order_id, amount = request.amount_cents, currency = %request.currency),
    err(Display)
  )]
  async fn create_checkout_session(&self, request: &CheckoutSessionRequest) -> AppResult<CheckoutSession> {
    if request.amount_cents <= 0 {
      return Err(AppError::Payment("Amount must be greater than zero.".to_string()));
    }
    if request.currency.trim().is_empty() {
      return Err(AppError::Payment("Currency is required.".to_string()));
    }
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;

    let id = format!("cs_{}", Uuid::new_v4().simple());
    let url = format!("{}/{}", self.checkout_base_url, id);
    info!(session_id = %id, "Hosted checkout session created.");
    Ok(CheckoutSession { id, url })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn request(amount_cents: i64) -> CheckoutSessionRequest {
    CheckoutSessionRequest {
      order_id: Uuid::new_v4(),
      amount_cents,
      currency: "usd".into(),
      customer_email: "ann@example.com".into(),
      success_url: "http://localhost/ok".into(),
      cancel_url: "http://localhost/cancel".into(),
      metadata: HashMap::new(),
    }
  }

  #[tokio::test]
  async fn session_url_points_at_hosted_page() {
    let gateway = HostedCheckoutGateway::new("http://pay.local/checkout/");
    let session = gateway.create_checkout_session(&request(1000)).await.unwrap();
    assert!(session.id.starts_with("cs_"));
    assert_eq!(session.url, format!("http://pay.local/checkout/{}", session.id));
  }

  #[tokio::test]
  async fn zero_amount_is_refused() {
    let gateway = HostedCheckoutGateway::new("http://pay.local");
    assert!(matches!(
      gateway.create_checkout_session(&request(0)).await,
      Err(AppError::Payment(_))
    ));
  }
}
