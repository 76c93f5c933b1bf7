// bazaar/src/models/user.rs

use crate::errors::{AppError, Result};
use crate::models::cart::CartLine;
use crate::models::verification::{ModerationDecision, VerificationStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
  #[serde(rename = "user")]
  User,
  #[serde(rename = "vendor")]
  Vendor,
  #[serde(rename = "admin")]
  Admin,
  #[serde(rename = "deliveryGuy")]
  DeliveryGuy,
}

impl Role {
  pub fn as_str(&self) -> &'static str {
    match self {
      Role::User => "user",
      Role::Vendor => "vendor",
      Role::Admin => "admin",
      Role::DeliveryGuy => "deliveryGuy",
    }
  }

  /// API area each role lands on, relative to `/api/v1`.
  pub fn home_prefix(&self) -> &'static str {
    match self {
      Role::User => "/user",
      Role::Vendor => "/vendor",
      Role::Admin => "/admin",
      Role::DeliveryGuy => "/delivery",
    }
  }
}

impl fmt::Display for Role {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Role {
  type Err = AppError;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "user" => Ok(Role::User),
      "vendor" => Ok(Role::Vendor),
      "admin" => Ok(Role::Admin),
      "deliveryGuy" => Ok(Role::DeliveryGuy),
      other => Err(AppError::Validation(format!("Unknown role '{}'.", other))),
    }
  }
}

/// Business details a vendor submits for shop verification.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopDetails {
  pub shop_name: String,
  pub shop_address: String,
  pub tax_id: String,
}

impl ShopDetails {
  pub fn validated(self) -> Result<Self> {
    let shop_name = self.shop_name.trim().to_string();
    let shop_address = self.shop_address.trim().to_string();
    let tax_id = self.tax_id.trim().to_string();
    if shop_name.is_empty() || shop_address.is_empty() || tax_id.is_empty() {
      return Err(AppError::Validation(
        "Shop name, shop address and tax id are all required.".to_string(),
      ));
    }
    Ok(Self {
      shop_name,
      shop_address,
      tax_id,
    })
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
  pub id: Uuid,
  pub name: String,
  pub email: String,
  #[serde(skip_serializing, default)]
  pub password_hash: String,
  pub role: Role,

  pub shop_name: Option<String>,
  pub shop_address: Option<String>,
  pub tax_id: Option<String>,
  pub shop_verification_status: Option<VerificationStatus>,
  pub is_shop_approved: bool,
  pub shop_rejection_reason: Option<String>,
  pub shop_approved_at: Option<DateTime<Utc>>,

  pub cart: Vec<CartLine>,
  pub order_ids: Vec<Uuid>,

  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl User {
  pub fn new(name: &str, email: &str, password_hash: String, role: Role) -> Self {
    let now = Utc::now();
    Self {
      id: Uuid::new_v4(),
      name: name.trim().to_string(),
      email: email.trim().to_lowercase(),
      password_hash,
      role,
      shop_name: None,
      shop_address: None,
      tax_id: None,
      shop_verification_status: None,
      is_shop_approved: false,
      shop_rejection_reason: None,
      shop_approved_at: None,
      cart: Vec::new(),
      order_ids: Vec::new(),
      created_at: now,
      updated_at: now,
    }
  }

  /// Vendors may list products only once their shop is approved.
  pub fn can_sell(&self) -> bool {
    self.role == Role::Vendor && self.is_shop_approved
  }

  /// (Re-)submits shop details. Always resets the shop to `pending`.
  pub fn submit_shop(&mut self, details: ShopDetails) -> Result<()> {
    if self.role != Role::Vendor {
      return Err(AppError::Forbidden("Only vendors can submit shop details.".to_string()));
    }
    let details = details.validated()?;
    self.shop_name = Some(details.shop_name);
    self.shop_address = Some(details.shop_address);
    self.tax_id = Some(details.tax_id);
    self.set_shop_status(VerificationStatus::Pending);
    self.shop_rejection_reason = None;
    self.shop_approved_at = None;
    self.updated_at = Utc::now();
    Ok(())
  }

  /// Applies an admin decision. The latest decision overwrites the previous one.
  pub fn apply_shop_decision(&mut self, decision: &ModerationDecision, now: DateTime<Utc>) -> Result<()> {
    if self.role != Role::Vendor {
      return Err(AppError::Validation(format!("User {} is not a vendor.", self.id)));
    }
    if self.shop_verification_status.is_none() {
      return Err(AppError::Validation(
        "This vendor has not submitted shop details yet.".to_string(),
      ));
    }
    match decision {
      ModerationDecision::Approve => {
        self.shop_rejection_reason = None;
        self.shop_approved_at = Some(now);
      }
      ModerationDecision::Reject { reason } => {
        self.shop_rejection_reason = Some(reason.clone());
        self.shop_approved_at = None;
      }
    }
    self.set_shop_status(decision.status());
    self.updated_at = now;
    Ok(())
  }

  // The only writer of the status/flag pair.
  fn set_shop_status(&mut self, status: VerificationStatus) {
    self.shop_verification_status = Some(status);
    self.is_shop_approved = status == VerificationStatus::Approved;
  }

  pub fn cart_quantity_of(&self, product_id: Uuid) -> i32 {
    self
      .cart
      .iter()
      .find(|line| line.product_id == product_id)
      .map(|line| line.quantity)
      .unwrap_or(0)
  }

  /// Adds `quantity` to the line for `product_id`, creating it if needed.
  pub fn merge_cart_line(&mut self, product_id: Uuid, quantity: i32) -> Result<CartLine> {
    if let Some(line) = self.cart.iter_mut().find(|line| line.product_id == product_id) {
      line.quantity = line
        .quantity
        .checked_add(quantity)
        .ok_or_else(|| AppError::Validation("Cart quantity is too large.".to_string()))?;
      let merged = *line;
      self.updated_at = Utc::now();
      return Ok(merged);
    }
    let line = CartLine { product_id, quantity };
    self.cart.push(line);
    self.updated_at = Utc::now();
    Ok(line)
  }

  /// Sets the quantity of an existing line; zero removes it. Returns `false`
  /// when the product is not in the cart.
  pub fn set_cart_quantity(&mut self, product_id: Uuid, quantity: i32) -> bool {
    let Some(idx) = self.cart.iter().position(|line| line.product_id == product_id) else {
      return false;
    };
    if quantity == 0 {
      self.cart.remove(idx);
    } else {
      self.cart[idx].quantity = quantity;
    }
    self.updated_at = Utc::now();
    true
  }

  pub fn remove_cart_line(&mut self, product_id: Uuid) -> bool {
    let before = self.cart.len();
    self.cart.retain(|line| line.product_id != product_id);
    self.updated_at = Utc::now();
    self.cart.len() != before
  }

  pub fn clear_cart(&mut self) {
    self.cart.clear();
    self.updated_at = Utc::now();
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn vendor() -> User {
    User::new("Shop Owner", "Owner@Example.com", "hash".into(), Role::Vendor)
  }

  fn details() -> ShopDetails {
    ShopDetails {
      shop_name: "Corner Shop".into(),
      shop_address: "1 Main St".into(),
      tax_id: "TX-1".into(),
    }
  }

  #[test]
  fn email_is_stored_lower_cased() {
    assert_eq!(vendor().email, "owner@example.com");
  }

  #[test]
  fn shop_flag_follows_status() {
    let mut v = vendor();
    v.submit_shop(details()).unwrap();
    assert_eq!(v.shop_verification_status, Some(VerificationStatus::Pending));
    assert!(!v.is_shop_approved);

    let now = Utc::now();
    v.apply_shop_decision(&ModerationDecision::Approve, now).unwrap();
    assert!(v.is_shop_approved);
    assert!(v.can_sell());
    assert_eq!(v.shop_approved_at, Some(now));

    v.apply_shop_decision(
      &ModerationDecision::Reject {
        reason: "tax id mismatch".into(),
      },
      Utc::now(),
    )
    .unwrap();
    assert_eq!(v.shop_verification_status, Some(VerificationStatus::Rejected));
    assert!(!v.is_shop_approved);
    assert_eq!(v.shop_rejection_reason.as_deref(), Some("tax id mismatch"));

    v.submit_shop(details()).unwrap();
    assert_eq!(v.shop_verification_status, Some(VerificationStatus::Pending));
    assert!(v.shop_rejection_reason.is_none());
    assert!(!v.is_shop_approved);
  }

  #[test]
  fn decision_requires_submitted_shop() {
    let mut v = vendor();
    assert!(v.apply_shop_decision(&ModerationDecision::Approve, Utc::now()).is_err());
    assert!(!v.is_shop_approved);
  }

  #[test]
  fn incomplete_shop_details_are_rejected() {
    let mut v = vendor();
    let mut incomplete = details();
    incomplete.tax_id = "  ".into();
    assert!(matches!(v.submit_shop(incomplete), Err(AppError::Validation(_))));
    assert!(v.shop_verification_status.is_none());
  }

  #[test]
  fn cart_lines_merge_and_remove() {
    let mut u = User::new("Buyer", "buyer@example.com", "hash".into(), Role::User);
    let p = Uuid::new_v4();
    u.merge_cart_line(p, 2).unwrap();
    let line = u.merge_cart_line(p, 1).unwrap();
    assert_eq!(line.quantity, 3);
    assert_eq!(u.cart.len(), 1);
    assert!(u.set_cart_quantity(p, 5));
    assert_eq!(u.cart_quantity_of(p), 5);
    assert!(u.set_cart_quantity(p, 0));
    assert!(u.cart.is_empty());
    assert!(!u.set_cart_quantity(p, 1));
    assert!(!u.remove_cart_line(p));
  }

  #[test]
  fn oversized_cart_merge_is_rejected() {
    let mut u = User::new("Buyer", "buyer@example.com", "hash".into(), Role::User);
    let p = Uuid::new_v4();
    u.merge_cart_line(p, 1).unwrap();
    assert!(matches!(u.merge_cart_line(p, i32::MAX), Err(AppError::Validation(_))));
    assert_eq!(u.cart_quantity_of(p), 1);
  }

  #[test]
  fn role_wire_names() {
    assert_eq!(serde_json::to_value(Role::DeliveryGuy).unwrap(), serde_json::json!("deliveryGuy"));
    assert_eq!("deliveryGuy".parse::<Role>().unwrap(), Role::DeliveryGuy);
    assert!("courier".parse::<Role>().is_err());
  }
}
