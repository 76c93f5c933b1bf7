// bazaar/src/services/cart.rs

//! Cart reads and edits. Adding goes through the add-to-cart workflow; the
//! simpler edits live here.

use crate::errors::{AppError, Result};
use crate::models::{Product, User};
use crate::store::Store;
use serde::Serialize;
use std::collections::HashMap;
use tracing::instrument;
use uuid::Uuid;

/// A cart line joined with the live product.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemView {
  pub product_id: Uuid,
  pub title: String,
  pub price_cents: i64,
  pub quantity: i32,
  pub line_total_cents: i64,
  pub stock: i32,
  pub image: Option<String>,
  /// Visible and stocked for the requested quantity.
  pub available: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
  pub items: Vec<CartItemView>,
  /// Sum over available lines only.
  pub subtotal_cents: i64,
}

async fn load_user(store: &dyn Store, user_id: Uuid) -> Result<User> {
  store
    .user_by_id(user_id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("User {} not found.", user_id)))
}

pub async fn view_for(store: &dyn Store, user: &User) -> Result<CartView> {
  let ids: Vec<Uuid> = user.cart.iter().map(|line| line.product_id).collect();
  let products: HashMap<Uuid, Product> = store
    .products_by_ids(&ids)
    .await?
    .into_iter()
    .map(|p| (p.id, p))
    .collect();

  // Lines whose product was deleted are dropped from the view.
  let items: Vec<CartItemView> = user
    .cart
    .iter()
    .filter_map(|line| {
      let product = products.get(&line.product_id)?;
      Some(CartItemView {
        product_id: product.id,
        title: product.title.clone(),
        price_cents: product.price_cents,
        quantity: line.quantity,
        line_total_cents: product.price_cents * i64::from(line.quantity),
        stock: product.stock,
        image: product.images.first().cloned(),
        available: product.is_publicly_visible() && product.stock >= line.quantity,
      })
    })
    .collect();
  let subtotal_cents = items.iter().filter(|i| i.available).map(|i| i.line_total_cents).sum();
  Ok(CartView { items, subtotal_cents })
}

pub async fn view(store: &dyn Store, user_id: Uuid) -> Result<CartView> {
  let user = load_user(store, user_id).await?;
  view_for(store, &user).await
}

/// Zero removes the line.
#[instrument(name = "cart::set_quantity", skip(store), err(Display))]
pub async fn set_quantity(store: &dyn Store, user_id: Uuid, product_id: Uuid, quantity: i32) -> Result<CartView> {
  if quantity < 0 {
    return Err(AppError::Validation("Quantity cannot be negative.".to_string()));
  }
  if quantity > 0 {
    let product = store
      .product_by_id(product_id)
      .await?
      .filter(Product::is_publicly_visible)
      .ok_or_else(|| AppError::NotFound(format!("Product {} not found.", product_id)))?;
    if quantity > product.stock {
      return Err(AppError::Validation(format!(
        "Only {} unit(s) of '{}' are in stock.",
        product.stock, product.title
      )));
    }
  }

  let mut user = load_user(store, user_id).await?;
  if !user.set_cart_quantity(product_id, quantity) {
    return Err(AppError::NotFound("Product is not in your cart.".to_string()));
  }
  store.save_user(&user).await?;
  view_for(store, &user).await
}

#[instrument(name = "cart::remove_line", skip(store), err(Display))]
pub async fn remove_line(store: &dyn Store, user_id: Uuid, product_id: Uuid) -> Result<CartView> {
  let mut user = load_user(store, user_id).await?;
  if !user.remove_cart_line(product_id) {
    return Err(AppError::NotFound("Product is not in your cart.".to_string()));
  }
  store.save_user(&user).await?;
  view_for(store, &user).await
}

pub async fn clear(store: &dyn Store, user_id: Uuid) -> Result<()> {
  let mut user = load_user(store, user_id).await?;
  user.clear_cart();
  store.save_user(&user).await
}
