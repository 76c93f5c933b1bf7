// bazaar/src/store/postgres.rs

//! Postgres backend. Runtime-checked queries; embedded documents (cart,
//! reviews, order lines, shipping address) are JSONB columns.

use crate::errors::{AppError, Result};
use crate::models::{
  CartLine, Order, OrderLine, OrderStatus, PaymentStatus, Product, Review, ShippingAddress, User,
};
use crate::store::{concurrent_update, order_not_found, OrderFilter, ProductFilter, Store, UserFilter};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use std::str::FromStr;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

const USER_COLUMNS: &str = "id, name, email, password_hash, role, shop_name, shop_address, tax_id, \
  shop_verification_status, is_shop_approved, shop_rejection_reason, shop_approved_at, cart, order_ids, \
  created_at, updated_at";

const PRODUCT_COLUMNS: &str = "id, vendor_id, title, description, price_cents, stock, is_stock_available, \
  images, verification_status, rejection_reason, approved_at, is_active, reviews, created_at, updated_at";

const ORDER_COLUMNS: &str = "id, user_id, items, total_amount_cents, payment_method, payment_status, status, \
  shipping_address, payment_session_id, created_at, updated_at";

#[derive(Clone)]
pub struct PgStore {
  pool: PgPool,
}

impl PgStore {
  pub async fn connect(database_url: &str) -> Result<Self> {
    let pool = PgPoolOptions::new().max_connections(10).connect(database_url).await?;
    info!("Connected to the database.");
    Ok(Self { pool })
  }

  pub fn from_pool(pool: PgPool) -> Self {
    Self { pool }
  }

  /// Explains why a conditional order update touched no row.
  async fn lost_race(&self, order_id: Uuid) -> Result<AppError> {
    Ok(match self.order_by_id(order_id).await? {
      Some(current) => concurrent_update(current.status),
      None => order_not_found(order_id),
    })
  }

  pub async fn migrate(&self) -> Result<()> {
    sqlx::migrate!("./migrations").run(&self.pool).await.map_err(|e| {
      error!(error = %e, "Database migration failed.");
      AppError::Internal(format!("Migration failed: {}", e))
    })?;
    info!("Database migrations applied.");
    Ok(())
  }
}

// Stored enum text that no longer parses means the row is corrupt, not that the
// caller sent bad input.
fn parse_column<T: FromStr<Err = AppError>>(column: &str, value: &str) -> Result<T> {
  value
    .parse()
    .map_err(|_| AppError::Internal(format!("Unexpected value '{}' in column '{}'.", value, column)))
}

fn escape_like(raw: &str) -> String {
  raw.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
  matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[derive(FromRow)]
struct UserRow {
  id: Uuid,
  name: String,
  email: String,
  password_hash: String,
  role: String,
  shop_name: Option<String>,
  shop_address: Option<String>,
  tax_id: Option<String>,
  shop_verification_status: Option<String>,
  is_shop_approved: bool,
  shop_rejection_reason: Option<String>,
  shop_approved_at: Option<DateTime<Utc>>,
  cart: Json<Vec<CartLine>>,
  order_ids: Vec<Uuid>,
  created_at: DateTime<Utc>,
  updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
  type Error = AppError;

  fn try_from(row: UserRow) -> Result<Self> {
    Ok(User {
      id: row.id,
      name: row.name,
      email: row.email,
      password_hash: row.password_hash,
      role: parse_column("role", &row.role)?,
      shop_name: row.shop_name,
      shop_address: row.shop_address,
      tax_id: row.tax_id,
      shop_verification_status: row
        .shop_verification_status
        .as_deref()
        .map(|s| parse_column("shop_verification_status", s))
        .transpose()?,
      is_shop_approved: row.is_shop_approved,
      shop_rejection_reason: row.shop_rejection_reason,
      shop_approved_at: row.shop_approved_at,
      cart: row.cart.0,
      order_ids: row.order_ids,
      created_at: row.created_at,
      updated_at: row.updated_at,
    })
  }
}

#[derive(FromRow)]
struct ProductRow {
  id: Uuid,
  vendor_id: Uuid,
  title: String,
  description: String,
  price_cents: i64,
  stock: i32,
  is_stock_available: bool,
  images: Vec<String>,
  verification_status: String,
  rejection_reason: Option<String>,
  approved_at: Option<DateTime<Utc>>,
  is_active: bool,
  reviews: Json<Vec<Review>>,
  created_at: DateTime<Utc>,
  updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
  type Error = AppError;

  fn try_from(row: ProductRow) -> Result<Self> {
    Ok(Product {
      id: row.id,
      vendor_id: row.vendor_id,
      title: row.title,
      description: row.description,
      price_cents: row.price_cents,
      stock: row.stock,
      is_stock_available: row.is_stock_available,
      images: row.images,
      verification_status: parse_column("verification_status", &row.verification_status)?,
      rejection_reason: row.rejection_reason,
      approved_at: row.approved_at,
      is_active: row.is_active,
      reviews: row.reviews.0,
      created_at: row.created_at,
      updated_at: row.updated_at,
    })
  }
}

#[derive(FromRow)]
struct OrderRow {
  id: Uuid,
  user_id: Uuid,
  items: Json<Vec<OrderLine>>,
  total_amount_cents: i64,
  payment_method: String,
  payment_status: String,
  status: String,
  shipping_address: Json<ShippingAddress>,
  payment_session_id: Option<String>,
  created_at: DateTime<Utc>,
  updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
  type Error = AppError;

  fn try_from(row: OrderRow) -> Result<Self> {
    Ok(Order {
      id: row.id,
      user_id: row.user_id,
      items: row.items.0,
      total_amount_cents: row.total_amount_cents,
      payment_method: parse_column("payment_method", &row.payment_method)?,
      payment_status: parse_column("payment_status", &row.payment_status)?,
      status: parse_column("status", &row.status)?,
      shipping_address: row.shipping_address.0,
      payment_session_id: row.payment_session_id,
      created_at: row.created_at,
      updated_at: row.updated_at,
    })
  }
}

fn collect<R, M>(rows: Vec<R>) -> Result<Vec<M>>
where
  M: TryFrom<R, Error = AppError>,
{
  rows.into_iter().map(M::try_from).collect()
}

#[async_trait]
impl Store for PgStore {
  #[instrument(name = "pg_store::insert_user", skip(self, user), fields(user_id = %user.id), err(Display))]
  async fn insert_user(&self, user: &User) -> Result<()> {
    let result = sqlx::query(
      "INSERT INTO users (id, name, email, password_hash, role, shop_name, shop_address, tax_id, \
       shop_verification_status, is_shop_approved, shop_rejection_reason, shop_approved_at, cart, order_ids, \
       created_at, updated_at) \
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
    )
    .bind(user.id)
    .bind(&user.name)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(user.role.as_str())
    .bind(&user.shop_name)
    .bind(&user.shop_address)
    .bind(&user.tax_id)
    .bind(user.shop_verification_status.map(|s| s.as_str()))
    .bind(user.is_shop_approved)
    .bind(&user.shop_rejection_reason)
    .bind(user.shop_approved_at)
    .bind(Json(&user.cart))
    .bind(&user.order_ids)
    .bind(user.created_at)
    .bind(user.updated_at)
    .execute(&self.pool)
    .await;

    match result {
      Ok(_) => Ok(()),
      Err(e) if is_unique_violation(&e) => {
        warn!("Signup collided with an existing email.");
        Err(AppError::Conflict("An account with this email already exists.".to_string()))
      }
      Err(e) => Err(AppError::Sqlx(e)),
    }
  }

  async fn user_by_id(&self, id: Uuid) -> Result<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
    let row: Option<UserRow> = sqlx::query_as(&sql).bind(id).fetch_optional(&self.pool).await?;
    row.map(User::try_from).transpose()
  }

  async fn user_by_email(&self, email: &str) -> Result<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
    let row: Option<UserRow> = sqlx::query_as(&sql)
      .bind(email.trim().to_lowercase())
      .fetch_optional(&self.pool)
      .await?;
    row.map(User::try_from).transpose()
  }

  #[instrument(name = "pg_store::save_user", skip(self, user), fields(user_id = %user.id), err(Display))]
  async fn save_user(&self, user: &User) -> Result<()> {
    let result = sqlx::query(
      "UPDATE users SET name = $2, email = $3, password_hash = $4, role = $5, shop_name = $6, shop_address = $7, \
       tax_id = $8, shop_verification_status = $9, is_shop_approved = $10, shop_rejection_reason = $11, \
       shop_approved_at = $12, cart = $13, order_ids = $14, updated_at = $15 WHERE id = $1",
    )
    .bind(user.id)
    .bind(&user.name)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(user.role.as_str())
    .bind(&user.shop_name)
    .bind(&user.shop_address)
    .bind(&user.tax_id)
    .bind(user.shop_verification_status.map(|s| s.as_str()))
    .bind(user.is_shop_approved)
    .bind(&user.shop_rejection_reason)
    .bind(user.shop_approved_at)
    .bind(Json(&user.cart))
    .bind(&user.order_ids)
    .bind(user.updated_at)
    .execute(&self.pool)
    .await?;

    if result.rows_affected() == 0 {
      return Err(AppError::NotFound(format!("User {} not found.", user.id)));
    }
    Ok(())
  }

  async fn list_users(&self, filter: &UserFilter) -> Result<Vec<User>> {
    let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {USER_COLUMNS} FROM users WHERE TRUE"));
    if let Some(role) = filter.role {
      qb.push(" AND role = ").push_bind(role.as_str());
    }
    if let Some(status) = filter.shop_status {
      qb.push(" AND shop_verification_status = ").push_bind(status.as_str());
    }
    qb.push(" ORDER BY created_at DESC");
    let rows: Vec<UserRow> = qb.build_query_as().fetch_all(&self.pool).await?;
    collect(rows)
  }

  #[instrument(name = "pg_store::insert_product", skip(self, product), fields(product_id = %product.id), err(Display))]
  async fn insert_product(&self, product: &Product) -> Result<()> {
    sqlx::query(
      "INSERT INTO products (id, vendor_id, title, description, price_cents, stock, is_stock_available, images, \
       verification_status, rejection_reason, approved_at, is_active, reviews, created_at, updated_at) \
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
    )
    .bind(product.id)
    .bind(product.vendor_id)
    .bind(&product.title)
    .bind(&product.description)
    .bind(product.price_cents)
    .bind(product.stock)
    .bind(product.is_stock_available)
    .bind(&product.images)
    .bind(product.verification_status.as_str())
    .bind(&product.rejection_reason)
    .bind(product.approved_at)
    .bind(product.is_active)
    .bind(Json(&product.reviews))
    .bind(product.created_at)
    .bind(product.updated_at)
    .execute(&self.pool)
    .await?;
    Ok(())
  }

  async fn product_by_id(&self, id: Uuid) -> Result<Option<Product>> {
    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1");
    let row: Option<ProductRow> = sqlx::query_as(&sql).bind(id).fetch_optional(&self.pool).await?;
    row.map(Product::try_from).transpose()
  }

  async fn products_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Product>> {
    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1)");
    let rows: Vec<ProductRow> = sqlx::query_as(&sql).bind(ids).fetch_all(&self.pool).await?;
    collect(rows)
  }

  #[instrument(name = "pg_store::save_product", skip(self, product), fields(product_id = %product.id), err(Display))]
  async fn save_product(&self, product: &Product) -> Result<()> {
    let result = sqlx::query(
      "UPDATE products SET title = $2, description = $3, price_cents = $4, stock = $5, is_stock_available = $6, \
       images = $7, verification_status = $8, rejection_reason = $9, approved_at = $10, is_active = $11, \
       reviews = $12, updated_at = $13 WHERE id = $1",
    )
    .bind(product.id)
    .bind(&product.title)
    .bind(&product.description)
    .bind(product.price_cents)
    .bind(product.stock)
    .bind(product.is_stock_available)
    .bind(&product.images)
    .bind(product.verification_status.as_str())
    .bind(&product.rejection_reason)
    .bind(product.approved_at)
    .bind(product.is_active)
    .bind(Json(&product.reviews))
    .bind(product.updated_at)
    .execute(&self.pool)
    .await?;

    if result.rows_affected() == 0 {
      return Err(AppError::NotFound(format!("Product {} not found.", product.id)));
    }
    Ok(())
  }

  async fn delete_product(&self, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1").bind(id).execute(&self.pool).await?;
    Ok(result.rows_affected() > 0)
  }

  async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>> {
    let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE TRUE"));
    if let Some(vendor_id) = filter.vendor_id {
      qb.push(" AND vendor_id = ").push_bind(vendor_id);
    }
    if let Some(status) = filter.status {
      qb.push(" AND verification_status = ").push_bind(status.as_str());
    }
    if let Some(active) = filter.active {
      qb.push(" AND is_active = ").push_bind(active);
    }
    if let Some(search) = filter.search.as_deref() {
      qb.push(" AND title ILIKE ").push_bind(format!("%{}%", escape_like(search)));
    }
    qb.push(" ORDER BY created_at DESC");
    let rows: Vec<ProductRow> = qb.build_query_as().fetch_all(&self.pool).await?;
    collect(rows)
  }

  #[instrument(name = "pg_store::commit_checkout", skip(self, order), fields(order_id = %order.id, lines = order.items.len()), err(Display))]
  async fn commit_checkout(&self, order: &Order) -> Result<()> {
    let mut tx = self.pool.begin().await?;

    for line in &order.items {
      // The WHERE clause is the oversell guard; SET sees the pre-update stock.
      let updated = sqlx::query(
        "UPDATE products SET stock = stock - $1, is_stock_available = (stock - $1) > 0, updated_at = NOW() \
         WHERE id = $2 AND stock >= $1 AND is_active AND verification_status = 'approved'",
      )
      .bind(line.quantity)
      .bind(line.product_id)
      .execute(&mut *tx)
      .await?;

      if updated.rows_affected() == 0 {
        warn!(product_id = %line.product_id, "Checkout commit refused: line can no longer be served.");
        tx.rollback().await?;
        return Err(AppError::Validation(format!(
          "Insufficient stock for product '{}'.",
          line.title
        )));
      }
    }

    sqlx::query(
      "INSERT INTO orders (id, user_id, items, total_amount_cents, payment_method, payment_status, status, \
       shipping_address, payment_session_id, created_at, updated_at) \
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
    )
    .bind(order.id)
    .bind(order.user_id)
    .bind(Json(&order.items))
    .bind(order.total_amount_cents)
    .bind(order.payment_method.as_str())
    .bind(order.payment_status.as_str())
    .bind(order.status.as_str())
    .bind(Json(&order.shipping_address))
    .bind(&order.payment_session_id)
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(&mut *tx)
    .await?;

    let ordered: Vec<String> = order.items.iter().map(|line| line.product_id.to_string()).collect();
    let linked = sqlx::query(
      "UPDATE users SET cart = COALESCE((SELECT jsonb_agg(line) FROM jsonb_array_elements(cart) AS line \
       WHERE NOT (line->>'productId' = ANY($3))), '[]'::jsonb), \
       order_ids = array_append(order_ids, $1), updated_at = NOW() WHERE id = $2",
    )
    .bind(order.id)
    .bind(order.user_id)
    .bind(&ordered)
    .execute(&mut *tx)
    .await?;
    if linked.rows_affected() == 0 {
      tx.rollback().await?;
      return Err(AppError::NotFound(format!("User {} not found.", order.user_id)));
    }

    tx.commit().await?;
    Ok(())
  }

  async fn order_by_id(&self, id: Uuid) -> Result<Option<Order>> {
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
    let row: Option<OrderRow> = sqlx::query_as(&sql).bind(id).fetch_optional(&self.pool).await?;
    row.map(Order::try_from).transpose()
  }

  #[instrument(name = "pg_store::advance_order", skip(self), err(Display))]
  async fn advance_order(&self, order_id: Uuid, from: OrderStatus, to: OrderStatus) -> Result<()> {
    let result = sqlx::query("UPDATE orders SET status = $3, updated_at = NOW() WHERE id = $1 AND status = $2")
      .bind(order_id)
      .bind(from.as_str())
      .bind(to.as_str())
      .execute(&self.pool)
      .await?;

    if result.rows_affected() == 0 {
      return Err(self.lost_race(order_id).await?);
    }
    Ok(())
  }

  #[instrument(name = "pg_store::settle_payment", skip(self), err(Display))]
  async fn settle_payment(&self, order_id: Uuid, status: PaymentStatus, session_id: Option<&str>) -> Result<bool> {
    let result = sqlx::query(
      "UPDATE orders SET payment_status = $2, payment_session_id = COALESCE(payment_session_id, $3), \
       updated_at = NOW() WHERE id = $1 AND payment_status <> 'Paid'",
    )
    .bind(order_id)
    .bind(status.as_str())
    .bind(session_id)
    .execute(&self.pool)
    .await?;

    if result.rows_affected() == 0 {
      return match self.order_by_id(order_id).await? {
        Some(_) => Ok(false),
        None => Err(order_not_found(order_id)),
      };
    }
    Ok(true)
  }

  async fn attach_payment_session(&self, order_id: Uuid, session_id: &str) -> Result<()> {
    let result = sqlx::query("UPDATE orders SET payment_session_id = $2, updated_at = NOW() WHERE id = $1")
      .bind(order_id)
      .bind(session_id)
      .execute(&self.pool)
      .await?;

    if result.rows_affected() == 0 {
      return Err(order_not_found(order_id));
    }
    Ok(())
  }

  #[instrument(name = "pg_store::cancel_order", skip(self, order), fields(order_id = %order.id), err(Display))]
  async fn cancel_order(&self, order: &Order) -> Result<()> {
    let mut tx = self.pool.begin().await?;

    let cancelled = sqlx::query(
      "UPDATE orders SET status = 'Cancelled', updated_at = NOW() \
       WHERE id = $1 AND status IN ('Processing', 'Confirmed')",
    )
    .bind(order.id)
    .execute(&mut *tx)
    .await?;

    if cancelled.rows_affected() == 0 {
      tx.rollback().await?;
      return Err(self.lost_race(order.id).await?);
    }

    for line in &order.items {
      sqlx::query(
        "UPDATE products SET stock = stock + $1, is_stock_available = (stock + $1) > 0, updated_at = NOW() \
         WHERE id = $2",
      )
      .bind(line.quantity)
      .bind(line.product_id)
      .execute(&mut *tx)
      .await?;
    }

    tx.commit().await?;
    Ok(())
  }

  async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>> {
    let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {ORDER_COLUMNS} FROM orders WHERE TRUE"));
    if let Some(user_id) = filter.user_id {
      qb.push(" AND user_id = ").push_bind(user_id);
    }
    if let Some(vendor_id) = filter.vendor_id {
      qb.push(" AND items @> ").push_bind(Json(json!([{ "vendorId": vendor_id }])));
    }
    if let Some(status) = filter.status {
      qb.push(" AND status = ").push_bind(status.as_str());
    }
    qb.push(" ORDER BY created_at DESC");
    let rows: Vec<OrderRow> = qb.build_query_as().fetch_all(&self.pool).await?;
    collect(rows)
  }
}
