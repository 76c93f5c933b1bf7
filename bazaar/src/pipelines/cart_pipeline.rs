// bazaar/src/pipelines/cart_pipeline.rs

use crate::errors::{AppError, Result as AppResult};
use crate::models::Product;
use crate::pipelines::contexts::AddToCartCtxData;
use conveyor::{Flow, Registry, Shared, StepSpec, Workflow};
use tracing::{info, warn};

pub fn register_add_to_cart_pipeline(registry: &Registry<AppError>) {
  let mut p = Workflow::<AddToCartCtxData, AppError>::new(
    "add_to_cart",
    [
      StepSpec::required("validate_cart_input"),
      StepSpec::required("fetch_product_for_cart"),
      StepSpec::required("check_stock_for_cart"),
      StepSpec::required("save_cart_line"),
    ],
  );

  p.on("validate_cart_input", |ctx: Shared<AddToCartCtxData>| async move {
    let quantity = ctx.read().quantity;
    if quantity <= 0 {
      warn!(quantity, "Add to cart rejected: quantity must be positive.");
      return Err(AppError::Validation("Quantity must be a positive number.".to_string()));
    }
    Ok(Flow::Continue)
  });

  p.on("fetch_product_for_cart", fetch_product_for_cart);
  p.on("check_stock_for_cart", check_stock_for_cart);
  p.on("save_cart_line", save_cart_line);

  registry.register(p);
  info!("Add-to-cart workflow registered.");
}

async fn fetch_product_for_cart(ctx: Shared<AddToCartCtxData>) -> AppResult<Flow> {
  let (product_id, user_id, store) = {
    let guard = ctx.read();
    (guard.product_id, guard.user_id, guard.app_state.store.clone())
  };

  let product = store
    .product_by_id(product_id)
    .await?
    .filter(Product::is_publicly_visible)
    .ok_or_else(|| AppError::NotFound(format!("Product {} not found.", product_id)))?;
  let user = store
    .user_by_id(user_id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("User {} not found.", user_id)))?;

  let mut guard = ctx.write();
  guard.product = Some(product);
  guard.user = Some(user);
  Ok(Flow::Continue)
}

/// The quantity already in the cart counts against stock too.
async fn check_stock_for_cart(ctx: Shared<AddToCartCtxData>) -> AppResult<Flow> {
  let guard = ctx.read();
  let (Some(product), Some(user)) = (guard.product.as_ref(), guard.user.as_ref()) else {
    return Err(AppError::Internal("Cart context incomplete before stock check.".to_string()));
  };

  let combined = user.cart_quantity_of(product.id).checked_add(guard.quantity);
  if combined.map_or(true, |combined| combined > product.stock) {
    warn!(product_id = %product.id, ?combined, stock = product.stock, "Add to cart exceeds stock.");
    return Err(AppError::Validation(format!(
      "Only {} unit(s) of '{}' are in stock.",
      product.stock, product.title
    )));
  }
  Ok(Flow::Continue)
}

async fn save_cart_line(ctx: Shared<AddToCartCtxData>) -> AppResult<Flow> {
  let (user, line, store) = {
    let mut guard = ctx.write();
    let (product_id, quantity) = (guard.product_id, guard.quantity);
    let store = guard.app_state.store.clone();
    let user = guard
      .user
      .as_mut()
      .ok_or_else(|| AppError::Internal("Cart context missing its user.".to_string()))?;
    let line = user.merge_cart_line(product_id, quantity)?;
    (user.clone(), line, store)
  };

  store.save_user(&user).await?;
  info!(product_id = %line.product_id, quantity = line.quantity, "Cart line saved.");
  ctx.write().updated_line = Some(line);
  Ok(Flow::Continue)
}
