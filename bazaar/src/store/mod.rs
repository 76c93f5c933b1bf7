// bazaar/src/store/mod.rs

//! Persistence behind one trait, with a Postgres and an in-memory backend.
//!
//! Multi-document writes (`commit_checkout`, `cancel_order`) are atomic in both
//! backends: either every change lands or none does.

use crate::errors::{AppError, Result};
use crate::models::{Order, OrderStatus, PaymentStatus, Product, Role, User, VerificationStatus};
use async_trait::async_trait;
use uuid::Uuid;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Clone, Default)]
pub struct UserFilter {
  pub role: Option<Role>,
  pub shop_status: Option<VerificationStatus>,
}

#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
  pub vendor_id: Option<Uuid>,
  pub status: Option<VerificationStatus>,
  pub active: Option<bool>,
  /// Case-insensitive substring of the title.
  pub search: Option<String>,
}

impl ProductFilter {
  /// Approved and active listings only.
  pub fn publicly_visible() -> Self {
    Self {
      status: Some(VerificationStatus::Approved),
      active: Some(true),
      ..Default::default()
    }
  }

  pub fn matches(&self, product: &Product) -> bool {
    self.vendor_id.map_or(true, |v| product.vendor_id == v)
      && self.status.map_or(true, |s| product.verification_status == s)
      && self.active.map_or(true, |a| product.is_active == a)
      && self
        .search
        .as_deref()
        .map_or(true, |q| product.title.to_lowercase().contains(&q.to_lowercase()))
  }
}

#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
  pub user_id: Option<Uuid>,
  /// Orders with at least one line sold by this vendor.
  pub vendor_id: Option<Uuid>,
  pub status: Option<OrderStatus>,
}

impl OrderFilter {
  pub fn matches(&self, order: &Order) -> bool {
    self.user_id.map_or(true, |u| order.user_id == u)
      && self.vendor_id.map_or(true, |v| order.involves_vendor(v))
      && self.status.map_or(true, |s| order.status == s)
  }
}

pub(crate) fn order_not_found(order_id: Uuid) -> AppError {
  AppError::NotFound(format!("Order {} not found.", order_id))
}

/// A status write lost its race against another writer.
pub(crate) fn concurrent_update(current: OrderStatus) -> AppError {
  AppError::Conflict(format!(
    "Order was updated concurrently; its current status is {}.",
    current
  ))
}

#[async_trait]
pub trait Store: Send + Sync {
  /// Fails with `Conflict` when the email is taken.
  async fn insert_user(&self, user: &User) -> Result<()>;
  async fn user_by_id(&self, id: Uuid) -> Result<Option<User>>;
  async fn user_by_email(&self, email: &str) -> Result<Option<User>>;
  async fn save_user(&self, user: &User) -> Result<()>;
  async fn list_users(&self, filter: &UserFilter) -> Result<Vec<User>>;

  async fn insert_product(&self, product: &Product) -> Result<()>;
  async fn product_by_id(&self, id: Uuid) -> Result<Option<Product>>;
  async fn products_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Product>>;
  async fn save_product(&self, product: &Product) -> Result<()>;
  /// Returns `false` when nothing was deleted.
  async fn delete_product(&self, id: Uuid) -> Result<bool>;
  async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>>;

  /// Places `order` in one atomic step: decrements stock per line (only where
  /// stock still covers the quantity and the product is still sellable),
  /// inserts the order, empties the buyer's cart and links the order to the
  /// buyer. A line that can no longer be served fails the whole commit with
  /// `Validation` and nothing is written. Only the ordered products leave the
  /// cart; lines added meanwhile stay.
  async fn commit_checkout(&self, order: &Order) -> Result<()>;
  async fn order_by_id(&self, id: Uuid) -> Result<Option<Order>>;
  /// Moves the stored order from `from` to `to`, and nothing else. Fails with
  /// `Conflict` echoing the current status when the stored status is no longer
  /// `from`.
  async fn advance_order(&self, order_id: Uuid, from: OrderStatus, to: OrderStatus) -> Result<()>;
  /// Writes the payment status without touching the fulfilment status. `Paid`
  /// is never overwritten: returns `false` when the order was already paid.
  /// `session_id` only fills a missing session id.
  async fn settle_payment(&self, order_id: Uuid, status: PaymentStatus, session_id: Option<&str>) -> Result<bool>;
  async fn attach_payment_session(&self, order_id: Uuid, session_id: &str) -> Result<()>;
  /// Moves the stored order to `Cancelled` and returns its quantities to
  /// stock, atomically. Fails with `Conflict` if the stored order is no longer
  /// cancellable. Other stored fields are left as they are.
  async fn cancel_order(&self, order: &Order) -> Result<()>;
  /// Newest first.
  async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>>;
}
