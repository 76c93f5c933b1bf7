// bazaar/src/store/memory.rs

//! In-process store. One lock guards every table, so multi-document writes are
//! atomic by construction.

use crate::errors::{AppError, Result};
use crate::models::{Order, OrderStatus, PaymentStatus, Product, User};
use crate::store::{concurrent_update, order_not_found, OrderFilter, ProductFilter, Store, UserFilter};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

#[derive(Default)]
struct Tables {
  users: HashMap<Uuid, User>,
  products: HashMap<Uuid, Product>,
  orders: HashMap<Uuid, Order>,
}

#[derive(Default)]
pub struct MemoryStore {
  tables: RwLock<Tables>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl Store for MemoryStore {
  async fn insert_user(&self, user: &User) -> Result<()> {
    let mut tables = self.tables.write();
    if tables.users.values().any(|u| u.email == user.email) {
      return Err(AppError::Conflict("An account with this email already exists.".to_string()));
    }
    tables.users.insert(user.id, user.clone());
    Ok(())
  }

  async fn user_by_id(&self, id: Uuid) -> Result<Option<User>> {
    Ok(self.tables.read().users.get(&id).cloned())
  }

  async fn user_by_email(&self, email: &str) -> Result<Option<User>> {
    let email = email.trim().to_lowercase();
    Ok(self.tables.read().users.values().find(|u| u.email == email).cloned())
  }

  async fn save_user(&self, user: &User) -> Result<()> {
    let mut tables = self.tables.write();
    match tables.users.get_mut(&user.id) {
      Some(slot) => {
        *slot = user.clone();
        Ok(())
      }
      None => Err(AppError::NotFound(format!("User {} not found.", user.id))),
    }
  }

  async fn list_users(&self, filter: &UserFilter) -> Result<Vec<User>> {
    let tables = self.tables.read();
    let mut users: Vec<User> = tables
      .users
      .values()
      .filter(|u| filter.role.map_or(true, |r| u.role == r))
      .filter(|u| filter.shop_status.map_or(true, |s| u.shop_verification_status == Some(s)))
      .cloned()
      .collect();
    users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(users)
  }

  async fn insert_product(&self, product: &Product) -> Result<()> {
    self.tables.write().products.insert(product.id, product.clone());
    Ok(())
  }

  async fn product_by_id(&self, id: Uuid) -> Result<Option<Product>> {
    Ok(self.tables.read().products.get(&id).cloned())
  }

  async fn products_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Product>> {
    let tables = self.tables.read();
    Ok(ids.iter().filter_map(|id| tables.products.get(id).cloned()).collect())
  }

  async fn save_product(&self, product: &Product) -> Result<()> {
    let mut tables = self.tables.write();
    match tables.products.get_mut(&product.id) {
      Some(slot) => {
        *slot = product.clone();
        Ok(())
      }
      None => Err(AppError::NotFound(format!("Product {} not found.", product.id))),
    }
  }

  async fn delete_product(&self, id: Uuid) -> Result<bool> {
    Ok(self.tables.write().products.remove(&id).is_some())
  }

  async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>> {
    let tables = self.tables.read();
    let mut products: Vec<Product> = tables.products.values().filter(|p| filter.matches(p)).cloned().collect();
    products.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(products)
  }

  #[instrument(name = "memory_store::commit_checkout", skip(self, order), fields(order_id = %order.id))]
  async fn commit_checkout(&self, order: &Order) -> Result<()> {
    let mut tables = self.tables.write();

    // Check every line before touching anything.
    for line in &order.items {
      let sellable = tables
        .products
        .get(&line.product_id)
        .is_some_and(|p| p.is_publicly_visible() && p.stock >= line.quantity);
      if !sellable {
        warn!(product_id = %line.product_id, "Checkout commit refused: line can no longer be served.");
        return Err(AppError::Validation(format!(
          "Insufficient stock for product '{}'.",
          line.title
        )));
      }
    }
    if !tables.users.contains_key(&order.user_id) {
      return Err(AppError::NotFound(format!("User {} not found.", order.user_id)));
    }

    for line in &order.items {
      if let Some(product) = tables.products.get_mut(&line.product_id) {
        let remaining = product.stock - line.quantity;
        product.set_stock(remaining);
      }
    }
    tables.orders.insert(order.id, order.clone());
    let ordered: HashSet<Uuid> = order.items.iter().map(|line| line.product_id).collect();
    if let Some(user) = tables.users.get_mut(&order.user_id) {
      user.cart.retain(|line| !ordered.contains(&line.product_id));
      user.order_ids.push(order.id);
      user.updated_at = Utc::now();
    }
    debug!("Checkout committed.");
    Ok(())
  }

  async fn order_by_id(&self, id: Uuid) -> Result<Option<Order>> {
    Ok(self.tables.read().orders.get(&id).cloned())
  }

  #[instrument(name = "memory_store::advance_order", skip(self))]
  async fn advance_order(&self, order_id: Uuid, from: OrderStatus, to: OrderStatus) -> Result<()> {
    let mut tables = self.tables.write();
    let stored = tables.orders.get_mut(&order_id).ok_or_else(|| order_not_found(order_id))?;
    if stored.status != from {
      warn!(current = %stored.status, "Order status write lost a race.");
      return Err(concurrent_update(stored.status));
    }
    stored.status = to;
    stored.updated_at = Utc::now();
    Ok(())
  }

  async fn settle_payment(&self, order_id: Uuid, status: PaymentStatus, session_id: Option<&str>) -> Result<bool> {
    let mut tables = self.tables.write();
    let stored = tables.orders.get_mut(&order_id).ok_or_else(|| order_not_found(order_id))?;
    if stored.payment_status == PaymentStatus::Paid {
      return Ok(false);
    }
    stored.payment_status = status;
    if stored.payment_session_id.is_none() {
      stored.payment_session_id = session_id.map(str::to_string);
    }
    stored.updated_at = Utc::now();
    Ok(true)
  }

  async fn attach_payment_session(&self, order_id: Uuid, session_id: &str) -> Result<()> {
    let mut tables = self.tables.write();
    let stored = tables.orders.get_mut(&order_id).ok_or_else(|| order_not_found(order_id))?;
    stored.payment_session_id = Some(session_id.to_string());
    stored.updated_at = Utc::now();
    Ok(())
  }

  #[instrument(name = "memory_store::cancel_order", skip(self, order), fields(order_id = %order.id))]
  async fn cancel_order(&self, order: &Order) -> Result<()> {
    let mut guard = self.tables.write();
    let tables = &mut *guard;
    let stored = tables.orders.get_mut(&order.id).ok_or_else(|| order_not_found(order.id))?;
    if !stored.status.is_cancellable() {
      return Err(concurrent_update(stored.status));
    }
    stored.status = OrderStatus::Cancelled;
    stored.updated_at = Utc::now();

    for line in &stored.items {
      // Deleted products have nothing to restock.
      if let Some(product) = tables.products.get_mut(&line.product_id) {
        let restocked = product.stock + line.quantity;
        product.set_stock(restocked);
      }
    }
    Ok(())
  }

  async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>> {
    let tables = self.tables.read();
    let mut orders: Vec<Order> = tables.orders.values().filter(|o| filter.matches(o)).cloned().collect();
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(orders)
  }
}
