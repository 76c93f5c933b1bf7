// bazaar/src/pipelines/contexts.rs

//! Context data for every workflow. Handlers receive these wrapped in
//! `conveyor::Shared`.

use crate::models::{CartLine, Order, PaymentMethod, Product, Role, ShippingAddress, User};
use crate::services::payment_gateway::CheckoutSession;
use crate::state::AppState;
use actix_web::web::Bytes;
use conveyor::Shared;
use serde::Deserialize;
use std::collections::HashMap;
use uuid::Uuid;

// --- Accounts ---

pub struct SignupCtxData {
  pub app_state: AppState,
  pub name: String,
  pub email: String,
  pub password: String,
  pub role: Role,
  pub created_user: Option<User>,
  pub welcome_email_sent: bool,
}

impl SignupCtxData {
  pub fn new(app_state: AppState, name: String, email: String, password: String, role: Role) -> Self {
    Self {
      app_state,
      name,
      email,
      password,
      role,
      created_user: None,
      welcome_email_sent: false,
    }
  }
}

pub struct SigninCtxData {
  pub app_state: AppState,
  pub email: String,
  pub password: String,
  pub user: Option<User>,
  pub session_token: Option<String>,
}

impl SigninCtxData {
  pub fn new(app_state: AppState, email: String, password: String) -> Self {
    Self {
      app_state,
      email,
      password,
      user: None,
      session_token: None,
    }
  }
}

// --- Cart ---

pub struct AddToCartCtxData {
  pub app_state: AppState,
  pub user_id: Uuid,
  pub product_id: Uuid,
  pub quantity: i32,
  pub product: Option<Product>,
  pub user: Option<User>,
  pub updated_line: Option<CartLine>,
}

impl AddToCartCtxData {
  pub fn new(app_state: AppState, user_id: Uuid, product_id: Uuid, quantity: i32) -> Self {
    Self {
      app_state,
      user_id,
      product_id,
      quantity,
      product: None,
      user: None,
      updated_line: None,
    }
  }
}

// --- Checkout ---

/// Sub-context of the payment branch. Filled by `commit_order`, read back by
/// the checkout workflow once the branch finishes.
pub struct PaymentCtxData {
  pub app_state: AppState,
  pub order: Option<Order>,
  pub customer_email: String,
  pub session: Option<CheckoutSession>,
}

impl PaymentCtxData {
  pub fn new(app_state: AppState) -> Self {
    Self {
      app_state,
      order: None,
      customer_email: String::new(),
      session: None,
    }
  }
}

pub struct CheckoutCtxData {
  pub app_state: AppState,
  pub user_id: Uuid,
  pub shipping_address: ShippingAddress,
  pub payment_method: PaymentMethod,

  pub user: Option<User>,
  pub products: HashMap<Uuid, Product>,
  pub order: Option<Order>,

  pub payment: Shared<PaymentCtxData>,
  pub redirect_url: Option<String>,
  pub confirmation_sent: bool,
}

impl CheckoutCtxData {
  pub fn new(app_state: AppState, user_id: Uuid, shipping_address: ShippingAddress, payment_method: PaymentMethod) -> Self {
    let payment = Shared::new(PaymentCtxData::new(app_state.clone()));
    Self {
      app_state,
      user_id,
      shipping_address,
      payment_method,
      user: None,
      products: HashMap::new(),
      order: None,
      payment,
      redirect_url: None,
      confirmation_sent: false,
    }
  }
}

// --- Payment webhooks ---

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentEventMetadata {
  pub order_id: Option<String>,
}

/// Provider event as received on the webhook.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentEvent {
  pub event_type: String,
  #[serde(default)]
  pub session_id: Option<String>,
  #[serde(default)]
  pub metadata: PaymentEventMetadata,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentEventKind {
  Completed,
  Failed,
  Other,
}

impl PaymentEvent {
  pub fn kind(&self) -> PaymentEventKind {
    match self.event_type.as_str() {
      "checkout.session.completed" => PaymentEventKind::Completed,
      "checkout.session.expired" | "payment.failed" => PaymentEventKind::Failed,
      _ => PaymentEventKind::Other,
    }
  }
}

pub struct SettlementCtxData {
  pub app_state: AppState,
  pub order: Order,
  pub session_id: Option<String>,
  /// Whether the stored order was modified.
  pub changed: bool,
}

pub struct PaymentWebhookCtxData {
  pub app_state: AppState,
  pub raw_body: Bytes,
  pub signature: Option<String>,
  pub event: Option<PaymentEvent>,
  pub settlement: Option<Shared<SettlementCtxData>>,
  pub acknowledged: bool,
}

impl PaymentWebhookCtxData {
  pub fn new(app_state: AppState, raw_body: Bytes, signature: Option<String>) -> Self {
    Self {
      app_state,
      raw_body,
      signature,
      event: None,
      settlement: None,
      acknowledged: false,
    }
  }

  pub fn event_kind(&self) -> Option<PaymentEventKind> {
    self.event.as_ref().map(PaymentEvent::kind)
  }
}
