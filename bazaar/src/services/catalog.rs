// bazaar/src/services/catalog.rs

//! Vendor listing management, the public catalog and reviews.

use crate::errors::{AppError, Result};
use crate::models::{Product, ProductDraft, Review, ReviewInput};
use crate::services::session::SessionClaims;
use crate::store::{ProductFilter, Store};
use tracing::{info, instrument};
use uuid::Uuid;

async fn owned_product(store: &dyn Store, vendor_id: Uuid, product_id: Uuid) -> Result<Product> {
  let product = store
    .product_by_id(product_id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Product {} not found.", product_id)))?;
  if product.vendor_id != vendor_id {
    return Err(AppError::Forbidden("You do not own this product.".to_string()));
  }
  Ok(product)
}

#[instrument(name = "catalog::create_product", skip(store, draft), fields(vendor_id = %vendor_id), err(Display))]
pub async fn create_product(store: &dyn Store, vendor_id: Uuid, draft: ProductDraft) -> Result<Product> {
  let vendor = store
    .user_by_id(vendor_id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("User {} not found.", vendor_id)))?;
  if !vendor.can_sell() {
    return Err(AppError::Forbidden(
      "Your shop must be approved before you can list products.".to_string(),
    ));
  }
  let product = Product::new(vendor_id, draft.validated()?);
  store.insert_product(&product).await?;
  info!(product_id = %product.id, "Product created and queued for review.");
  Ok(product)
}

#[instrument(name = "catalog::update_product", skip(store, draft), err(Display))]
pub async fn update_product(store: &dyn Store, vendor_id: Uuid, product_id: Uuid, draft: ProductDraft) -> Result<Product> {
  let draft = draft.validated()?;
  let mut product = owned_product(store, vendor_id, product_id).await?;
  product.apply_draft(draft);
  store.save_product(&product).await?;
  info!("Product updated and queued for review.");
  Ok(product)
}

#[instrument(name = "catalog::set_active", skip(store), err(Display))]
pub async fn set_active(store: &dyn Store, vendor_id: Uuid, product_id: Uuid, active: bool) -> Result<Product> {
  let mut product = owned_product(store, vendor_id, product_id).await?;
  product.is_active = active;
  product.updated_at = chrono::Utc::now();
  store.save_product(&product).await?;
  Ok(product)
}

#[instrument(name = "catalog::delete_product", skip(store), err(Display))]
pub async fn delete_product(store: &dyn Store, vendor_id: Uuid, product_id: Uuid) -> Result<()> {
  owned_product(store, vendor_id, product_id).await?;
  if !store.delete_product(product_id).await? {
    return Err(AppError::NotFound(format!("Product {} not found.", product_id)));
  }
  info!("Product deleted.");
  Ok(())
}

pub async fn vendor_products(store: &dyn Store, vendor_id: Uuid) -> Result<Vec<Product>> {
  store
    .list_products(&ProductFilter {
      vendor_id: Some(vendor_id),
      ..Default::default()
    })
    .await
}

pub async fn public_products(store: &dyn Store, search: Option<String>, vendor_id: Option<Uuid>) -> Result<Vec<Product>> {
  let filter = ProductFilter {
    vendor_id,
    search: search.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
    ..ProductFilter::publicly_visible()
  };
  store.list_products(&filter).await
}

/// Hidden listings are reported as missing.
pub async fn public_product(store: &dyn Store, product_id: Uuid) -> Result<Product> {
  store
    .product_by_id(product_id)
    .await?
    .filter(Product::is_publicly_visible)
    .ok_or_else(|| AppError::NotFound(format!("Product {} not found.", product_id)))
}

#[instrument(name = "catalog::add_review", skip(store, author, input), fields(user_id = %author.sub), err(Display))]
pub async fn add_review(store: &dyn Store, author: &SessionClaims, product_id: Uuid, input: ReviewInput) -> Result<Review> {
  let mut product = public_product(store, product_id).await?;
  let review = product.add_review(author.sub, &author.name, input)?.clone();
  store.save_product(&product).await?;
  info!(rating = review.rating, "Review added.");
  Ok(review)
}
