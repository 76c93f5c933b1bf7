// bazaar/src/services/moderation.rs

//! Shop verification for vendors and listing verification for products.
//! Both gates keep only the latest decision.

use crate::errors::{AppError, Result};
use crate::models::{ModerationDecision, Product, Role, ShopDetails, User, VerificationStatus};
use crate::store::{ProductFilter, Store, UserFilter};
use chrono::Utc;
use tracing::{info, instrument};
use uuid::Uuid;

async fn load_user(store: &dyn Store, user_id: Uuid) -> Result<User> {
  store
    .user_by_id(user_id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("User {} not found.", user_id)))
}

#[instrument(name = "moderation::submit_shop", skip(store, details), fields(vendor_id = %vendor_id), err(Display))]
pub async fn submit_shop(store: &dyn Store, vendor_id: Uuid, details: ShopDetails) -> Result<User> {
  let mut vendor = load_user(store, vendor_id).await?;
  vendor.submit_shop(details)?;
  store.save_user(&vendor).await?;
  info!("Shop details submitted for review.");
  Ok(vendor)
}

#[instrument(name = "moderation::decide_vendor", skip(store, decision), fields(vendor_id = %vendor_id, status = %decision.status()), err(Display))]
pub async fn decide_vendor(store: &dyn Store, vendor_id: Uuid, decision: ModerationDecision) -> Result<User> {
  let mut vendor = load_user(store, vendor_id).await?;
  if vendor.role != Role::Vendor {
    return Err(AppError::NotFound(format!("Vendor {} not found.", vendor_id)));
  }
  vendor.apply_shop_decision(&decision, Utc::now())?;
  store.save_user(&vendor).await?;
  info!("Vendor shop decision recorded.");
  Ok(vendor)
}

#[instrument(name = "moderation::decide_product", skip(store, decision), fields(product_id = %product_id, status = %decision.status()), err(Display))]
pub async fn decide_product(store: &dyn Store, product_id: Uuid, decision: ModerationDecision) -> Result<Product> {
  let mut product = store
    .product_by_id(product_id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Product {} not found.", product_id)))?;
  product.apply_decision(&decision, Utc::now());
  store.save_product(&product).await?;
  info!("Product decision recorded.");
  Ok(product)
}

pub async fn list_vendors(store: &dyn Store, status: Option<VerificationStatus>) -> Result<Vec<User>> {
  store
    .list_users(&UserFilter {
      role: Some(Role::Vendor),
      shop_status: status,
    })
    .await
}

pub async fn list_products(store: &dyn Store, status: Option<VerificationStatus>) -> Result<Vec<Product>> {
  store
    .list_products(&ProductFilter {
      status,
      ..Default::default()
    })
    .await
}
