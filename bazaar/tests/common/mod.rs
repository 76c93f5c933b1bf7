// tests/common/mod.rs
#![allow(dead_code)]

use async_trait::async_trait;
use bazaar::config::AppConfig;
use bazaar::errors::{AppError, Result};
use bazaar::models::{
  CartLine, ModerationDecision, Product, ProductDraft, Role, ShippingAddress, ShopDetails, User,
};
use bazaar::services::auth_service;
use bazaar::services::payment_gateway::{CheckoutSession, CheckoutSessionRequest, HostedCheckoutGateway, PaymentGateway};
use bazaar::services::session::SessionClaims;
use bazaar::state::AppState;
use bazaar::store::memory::MemoryStore;
use chrono::Utc;
use once_cell::sync::Lazy;
use std::sync::Arc;
use tracing::Level;
use uuid::Uuid;

pub const SESSION_SECRET: &str = "integration-test-session-secret-0123456789";
pub const WEBHOOK_SECRET: &str = "whsec_integration_test";
pub const CHECKOUT_URL: &str = "https://pay.example.test/checkout";
pub const PASSWORD: &str = "correct horse battery";

static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

/// Provider that is always down.
pub struct FailingGateway;

#[async_trait]
impl PaymentGateway for FailingGateway {
  async fn create_checkout_session(&self, _request: &CheckoutSessionRequest) -> Result<CheckoutSession> {
    Err(AppError::Payment("Provider unavailable.".to_string()))
  }
}

pub fn config(extra: &[(&'static str, &'static str)]) -> AppConfig {
  let mut pairs = vec![
    ("SESSION_SECRET", SESSION_SECRET),
    ("APP_BASE_URL", "https://shop.example.test"),
    ("PAYMENT_CHECKOUT_URL", CHECKOUT_URL),
    ("MAIL_SENDER", "no-reply@shop.example.test"),
  ];
  pairs.extend_from_slice(extra);
  AppConfig::from_pairs(pairs).expect("test config must be valid")
}

pub fn state() -> AppState {
  setup_tracing();
  AppState::new(
    config(&[]),
    Arc::new(MemoryStore::new()),
    Arc::new(HostedCheckoutGateway::new(CHECKOUT_URL)),
  )
}

pub fn state_with_webhook_secret() -> AppState {
  setup_tracing();
  AppState::new(
    config(&[("PAYMENT_WEBHOOK_SECRET", WEBHOOK_SECRET)]),
    Arc::new(MemoryStore::new()),
    Arc::new(HostedCheckoutGateway::new(CHECKOUT_URL)),
  )
}

pub fn state_with_gateway(gateway: Arc<dyn PaymentGateway>) -> AppState {
  setup_tracing();
  AppState::new(config(&[]), Arc::new(MemoryStore::new()), gateway)
}

pub async fn seed_user(state: &AppState, role: Role, email: &str) -> User {
  let hash = auth_service::hash_password(PASSWORD).expect("hashing works");
  let user = User::new("Test Person", email, hash, role);
  state.store.insert_user(&user).await.expect("insert user");
  user
}

pub async fn seed_customer(state: &AppState) -> User {
  seed_user(state, Role::User, &format!("customer-{}@example.com", Uuid::new_v4().simple())).await
}

/// Vendor whose shop has already been approved.
pub async fn seed_vendor(state: &AppState) -> User {
  let mut vendor = seed_user(state, Role::Vendor, &format!("vendor-{}@example.com", Uuid::new_v4().simple())).await;
  vendor
    .submit_shop(ShopDetails {
      shop_name: "Corner Shop".into(),
      shop_address: "2 Market Sq".into(),
      tax_id: "TX-1".into(),
    })
    .expect("submit shop");
  vendor
    .apply_shop_decision(&ModerationDecision::Approve, Utc::now())
    .expect("approve shop");
  state.store.save_user(&vendor).await.expect("save vendor");
  vendor
}

/// Approved, active listing.
pub async fn seed_product(state: &AppState, vendor_id: Uuid, title: &str, price_cents: i64, stock: i32) -> Product {
  let draft = ProductDraft {
    title: title.into(),
    description: String::new(),
    price_cents,
    stock,
    images: vec![],
  }
  .validated()
  .expect("valid draft");
  let mut product = Product::new(vendor_id, draft);
  product.apply_decision(&ModerationDecision::Approve, Utc::now());
  state.store.insert_product(&product).await.expect("insert product");
  product
}

pub async fn fill_cart(state: &AppState, user_id: Uuid, lines: &[(Uuid, i32)]) {
  let mut user = state.store.user_by_id(user_id).await.unwrap().expect("user exists");
  user.cart = lines
    .iter()
    .map(|(product_id, quantity)| CartLine {
      product_id: *product_id,
      quantity: *quantity,
    })
    .collect();
  state.store.save_user(&user).await.expect("save cart");
}

pub async fn stock_of(state: &AppState, product_id: Uuid) -> i32 {
  state.store.product_by_id(product_id).await.unwrap().expect("product exists").stock
}

pub fn claims_for(user: &User) -> SessionClaims {
  SessionClaims {
    sub: user.id,
    name: user.name.clone(),
    email: user.email.clone(),
    role: user.role,
    exp: i64::MAX,
  }
}

pub fn token_for(state: &AppState, user: &User) -> String {
  state.sessions.issue(user).expect("issue token")
}

pub fn address() -> ShippingAddress {
  ShippingAddress {
    street: "1 Main St".into(),
    city: "Springfield".into(),
    zip: "12345".into(),
    state: None,
    country: Some("US".into()),
    phone: None,
  }
}
