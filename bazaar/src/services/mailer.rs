// bazaar/src/services/mailer.rs

//! Outbound mail. Messages are logged rather than delivered.

use crate::errors::{AppError, Result as AppResult};
use crate::models::Order;
use tracing::{info, instrument, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct SentMail {
  pub to: String,
  pub subject: String,
  pub message_id: String,
}

#[derive(Debug, Clone)]
pub struct Mailer {
  sender: String,
}

impl Mailer {
  pub fn new(sender: impl Into<String>) -> Self {
    Self { sender: sender.into() }
  }

  pub async fn send_welcome(&self, to: &str, name: &str) -> AppResult<SentMail> {
    let body = format!("Hi {}, welcome to Bazaar!", name);
    self.send(to, "Welcome to Bazaar", &body).await
  }

  pub async fn send_order_confirmation(&self, to: &str, name: &str, order: &Order) -> AppResult<SentMail> {
    let subject = format!("Order {} received", order.id);
    let body = format!(
      "Hi {}, we received your order of {} item(s). Total: {}.{:02} ({}).",
      name,
      order.items.len(),
      order.total_amount_cents / 100,
      order.total_amount_cents % 100,
      order.payment_method.as_str()
    );
    self.send(to, &subject, &body).await
  }

  #[instrument(name = "mailer::send", skip(self, body), fields(from = %self.sender))]
  async fn send(&self, to: &str, subject: &str, body: &str) -> AppResult<SentMail> {
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;

    // The reserved `.invalid` TLD can never be delivered to.
    if to.trim().is_empty() || to.ends_with(".invalid") {
      warn!(%to, "Mail delivery refused.");
      return Err(AppError::Internal(format!("Cannot deliver mail to '{}'.", to)));
    }

    let message_id = format!("mail_{}", Uuid::new_v4().simple());
    info!(%to, %subject, %message_id, preview = %body.chars().take(60).collect::<String>(), "Mail sent.");
    Ok(SentMail {
      to: to.to_string(),
      subject: subject.to_string(),
      message_id,
    })
  }
}
