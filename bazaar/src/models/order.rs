// bazaar/src/models/order.rs

use crate::errors::{AppError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Fulfillment stage, independent of [`PaymentStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
  Processing,
  Confirmed,
  Shipped,
  Delivered,
  Cancelled,
}

impl OrderStatus {
  pub const ALL: [OrderStatus; 5] = [
    OrderStatus::Processing,
    OrderStatus::Confirmed,
    OrderStatus::Shipped,
    OrderStatus::Delivered,
    OrderStatus::Cancelled,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      OrderStatus::Processing => "Processing",
      OrderStatus::Confirmed => "Confirmed",
      OrderStatus::Shipped => "Shipped",
      OrderStatus::Delivered => "Delivered",
      OrderStatus::Cancelled => "Cancelled",
    }
  }

  /// Processing -> Confirmed -> Shipped -> Delivered, with cancellation
  /// allowed until the order ships.
  pub fn can_transition_to(self, next: OrderStatus) -> bool {
    use OrderStatus::*;
    matches!(
      (self, next),
      (Processing, Confirmed) | (Confirmed, Shipped) | (Shipped, Delivered) | (Processing, Cancelled) | (Confirmed, Cancelled)
    )
  }

  pub fn is_cancellable(self) -> bool {
    self.can_transition_to(OrderStatus::Cancelled)
  }
}

impl fmt::Display for OrderStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for OrderStatus {
  type Err = AppError;

  fn from_str(s: &str) -> Result<Self> {
    OrderStatus::ALL
      .into_iter()
      .find(|status| status.as_str() == s)
      .ok_or_else(|| AppError::Validation(format!("Unknown order status '{}'.", s)))
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentMethod {
  #[serde(rename = "COD")]
  Cod,
  #[serde(rename = "ONLINE")]
  Online,
}

impl PaymentMethod {
  pub fn as_str(&self) -> &'static str {
    match self {
      PaymentMethod::Cod => "COD",
      PaymentMethod::Online => "ONLINE",
    }
  }
}

impl FromStr for PaymentMethod {
  type Err = AppError;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "COD" => Ok(PaymentMethod::Cod),
      "ONLINE" => Ok(PaymentMethod::Online),
      other => Err(AppError::Validation(format!(
        "Unknown payment method '{}'; expected COD or ONLINE.",
        other
      ))),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentStatus {
  Pending,
  Paid,
  Failed,
}

impl PaymentStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      PaymentStatus::Pending => "Pending",
      PaymentStatus::Paid => "Paid",
      PaymentStatus::Failed => "Failed",
    }
  }
}

impl FromStr for PaymentStatus {
  type Err = AppError;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "Pending" => Ok(PaymentStatus::Pending),
      "Paid" => Ok(PaymentStatus::Paid),
      "Failed" => Ok(PaymentStatus::Failed),
      other => Err(AppError::Validation(format!("Unknown payment status '{}'.", other))),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
  pub street: String,
  pub city: String,
  pub zip: String,
  pub state: Option<String>,
  pub country: Option<String>,
  pub phone: Option<String>,
}

impl ShippingAddress {
  /// Trims every field. Street, city and zip must be non-blank.
  pub fn validated(self) -> Result<Self> {
    let required = |value: String, field: &str| {
      let value = value.trim().to_string();
      if value.is_empty() {
        Err(AppError::Validation(format!("Shipping address {} is required.", field)))
      } else {
        Ok(value)
      }
    };
    let optional = |value: Option<String>| value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
    Ok(Self {
      street: required(self.street, "street")?,
      city: required(self.city, "city")?,
      zip: required(self.zip, "zip")?,
      state: optional(self.state),
      country: optional(self.country),
      phone: optional(self.phone),
    })
  }
}

/// Purchased line. `price_cents` is the unit price at purchase time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
  pub product_id: Uuid,
  pub vendor_id: Uuid,
  pub title: String,
  pub quantity: i32,
  pub price_cents: i64,
}

impl OrderLine {
  pub fn line_total_cents(&self) -> i64 {
    self.price_cents * i64::from(self.quantity)
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
  pub id: Uuid,
  pub user_id: Uuid,
  pub items: Vec<OrderLine>,
  pub total_amount_cents: i64,
  pub payment_method: PaymentMethod,
  pub payment_status: PaymentStatus,
  pub status: OrderStatus,
  pub shipping_address: ShippingAddress,
  pub payment_session_id: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Order {
  pub fn new(user_id: Uuid, items: Vec<OrderLine>, shipping_address: ShippingAddress, payment_method: PaymentMethod) -> Self {
    let now = Utc::now();
    let total_amount_cents = items.iter().map(OrderLine::line_total_cents).sum();
    Self {
      id: Uuid::new_v4(),
      user_id,
      items,
      total_amount_cents,
      payment_method,
      payment_status: PaymentStatus::Pending,
      status: OrderStatus::Processing,
      shipping_address,
      payment_session_id: None,
      created_at: now,
      updated_at: now,
    }
  }

  pub fn involves_vendor(&self, vendor_id: Uuid) -> bool {
    self.items.iter().any(|line| line.vendor_id == vendor_id)
  }

  /// Moves the order to `next`. The error message always names the current status.
  pub fn transition_to(&mut self, next: OrderStatus) -> Result<()> {
    if !self.status.can_transition_to(next) {
      let message = if next == OrderStatus::Cancelled {
        format!("Order cannot be cancelled; its current status is {}.", self.status)
      } else {
        format!("Order cannot move to {}; its current status is {}.", next, self.status)
      };
      return Err(AppError::Validation(message));
    }
    self.status = next;
    self.updated_at = Utc::now();
    Ok(())
  }

  pub fn mark_paid(&mut self) {
    self.payment_status = PaymentStatus::Paid;
    self.updated_at = Utc::now();
  }

  /// Paid orders are never downgraded. Returns whether anything changed.
  pub fn mark_payment_failed(&mut self) -> bool {
    if self.payment_status == PaymentStatus::Paid {
      return false;
    }
    self.payment_status = PaymentStatus::Failed;
    self.updated_at = Utc::now();
    true
  }
}
