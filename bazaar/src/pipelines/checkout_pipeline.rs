// bazaar/src/pipelines/checkout_pipeline.rs

//! Order placement: cart -> line checks -> order -> atomic commit -> payment.

use crate::errors::{AppError, Result as AppResult};
use crate::models::{Order, OrderLine, PaymentMethod, Product, VerificationStatus};
use crate::pipelines::contexts::CheckoutCtxData;
use crate::pipelines::payment_flows::{cod_payment_flow, online_payment_flow};
use conveyor::{Flow, FlowError, Registry, Shared, StepSpec, Workflow};
use std::collections::HashMap;
use tracing::{event, info, warn, Level};
use uuid::Uuid;

pub fn register_checkout_pipeline(registry: &Registry<AppError>) {
  let mut p = Workflow::<CheckoutCtxData, AppError>::new(
    "checkout",
    [
      StepSpec::required("validate_shipping_address"),
      StepSpec::required("load_cart"),
      StepSpec::required("validate_cart_lines"),
      StepSpec::required("assemble_order"),
      StepSpec::required("commit_order"),
      StepSpec::required("initiate_payment"),
      StepSpec::optional("notify_customer"),
    ],
  );

  p.on("validate_shipping_address", validate_shipping_address);
  p.on("load_cart", load_cart);
  p.on("validate_cart_lines", validate_cart_lines);
  p.on("assemble_order", assemble_order);
  p.on("commit_order", commit_order);

  // Both routes share the root's payment sub-context, so the after-hook below
  // can read what the chosen flow produced.
  p.branch("initiate_payment")
    .route(
      "cod",
      |ctx: Shared<CheckoutCtxData>| ctx.read().payment_method == PaymentMethod::Cod,
      cod_payment_flow(),
      |ctx: Shared<CheckoutCtxData>| Ok::<_, FlowError>(ctx.read().payment.clone()),
    )
    .route(
      "online",
      |ctx: Shared<CheckoutCtxData>| ctx.read().payment_method == PaymentMethod::Online,
      online_payment_flow(),
      |ctx: Shared<CheckoutCtxData>| Ok::<_, FlowError>(ctx.read().payment.clone()),
    )
    .otherwise(Flow::Halt)
    .finish();

  p.after("initiate_payment", collect_payment_result);
  p.on("notify_customer", notify_customer);

  registry.register(p);
  info!("Checkout workflow registered.");
}

async fn validate_shipping_address(ctx: Shared<CheckoutCtxData>) -> AppResult<Flow> {
  let raw = ctx.read().shipping_address.clone();
  let address = raw.validated()?;
  ctx.write().shipping_address = address;
  Ok(Flow::Continue)
}

async fn load_cart(ctx: Shared<CheckoutCtxData>) -> AppResult<Flow> {
  let (user_id, store) = {
    let guard = ctx.read();
    (guard.user_id, guard.app_state.store.clone())
  };

  let user = store
    .user_by_id(user_id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("User {} not found.", user_id)))?;
  if user.cart.is_empty() {
    return Err(AppError::Validation("Your cart is empty.".to_string()));
  }

  let ids: Vec<Uuid> = user.cart.iter().map(|line| line.product_id).collect();
  let products: HashMap<Uuid, Product> = store.products_by_ids(&ids).await?.into_iter().map(|p| (p.id, p)).collect();
  event!(Level::DEBUG, lines = user.cart.len(), found = products.len(), "Cart loaded for checkout.");

  let mut guard = ctx.write();
  guard.user = Some(user);
  guard.products = products;
  Ok(Flow::Continue)
}

/// Every line must still be sellable in the requested quantity. The first
/// offending line rejects the whole checkout.
async fn validate_cart_lines(ctx: Shared<CheckoutCtxData>) -> AppResult<Flow> {
  let guard = ctx.read();
  let user = guard
    .user
    .as_ref()
    .ok_or_else(|| AppError::Internal("Checkout context has no user.".to_string()))?;

  for line in &user.cart {
    let Some(product) = guard.products.get(&line.product_id) else {
      warn!(product_id = %line.product_id, "Cart references a deleted product.");
      return Err(AppError::Validation(format!(
        "Product {} in your cart no longer exists.",
        line.product_id
      )));
    };
    if line.quantity <= 0 {
      return Err(AppError::Validation(format!(
        "Quantity for product '{}' must be positive.",
        product.title
      )));
    }
    if !product.is_active {
      return Err(AppError::Validation(format!(
        "Product '{}' is no longer available.",
        product.title
      )));
    }
    if product.verification_status != VerificationStatus::Approved {
      return Err(AppError::Validation(format!(
        "Product '{}' is not approved for sale.",
        product.title
      )));
    }
    if line.quantity > product.stock {
      return Err(AppError::Validation(format!(
        "Insufficient stock for product '{}': requested {}, available {}.",
        product.title, line.quantity, product.stock
      )));
    }
  }
  Ok(Flow::Continue)
}

/// Snapshots each line's current price into the order.
async fn assemble_order(ctx: Shared<CheckoutCtxData>) -> AppResult<Flow> {
  let order = {
    let guard = ctx.read();
    let user = guard
      .user
      .as_ref()
      .ok_or_else(|| AppError::Internal("Checkout context has no user.".to_string()))?;
    let mut lines = Vec::with_capacity(user.cart.len());
    for line in &user.cart {
      let product = guard
        .products
        .get(&line.product_id)
        .ok_or_else(|| AppError::Internal(format!("Product {} vanished from the context.", line.product_id)))?;
      lines.push(OrderLine {
        product_id: product.id,
        vendor_id: product.vendor_id,
        title: product.title.clone(),
        quantity: line.quantity,
        price_cents: product.price_cents,
      });
    }
    Order::new(user.id, lines, guard.shipping_address.clone(), guard.payment_method)
  };

  event!(Level::DEBUG, order_id = %order.id, total = order.total_amount_cents, "Order assembled.");
  ctx.write().order = Some(order);
  Ok(Flow::Continue)
}

async fn commit_order(ctx: Shared<CheckoutCtxData>) -> AppResult<Flow> {
  let (order, customer_email, store, payment) = {
    let guard = ctx.read();
    let order = guard
      .order
      .clone()
      .ok_or_else(|| AppError::Internal("Checkout context has no order.".to_string()))?;
    let email = guard.user.as_ref().map(|u| u.email.clone()).unwrap_or_default();
    (order, email, guard.app_state.store.clone(), guard.payment.clone())
  };

  store.commit_checkout(&order).await?;
  info!(order_id = %order.id, total = order.total_amount_cents, method = order.payment_method.as_str(), "Order placed.");

  let mut sub = payment.write();
  sub.order = Some(order);
  sub.customer_email = customer_email;
  Ok(Flow::Continue)
}

async fn collect_payment_result(ctx: Shared<CheckoutCtxData>) -> AppResult<Flow> {
  let payment = ctx.read().payment.clone();
  let (order, redirect_url) = {
    let sub = payment.read();
    (sub.order.clone(), sub.session.as_ref().map(|s| s.url.clone()))
  };

  let mut guard = ctx.write();
  if order.is_some() {
    guard.order = order;
  }
  guard.redirect_url = redirect_url;
  Ok(Flow::Continue)
}

async fn notify_customer(ctx: Shared<CheckoutCtxData>) -> AppResult<Flow> {
  let (mailer, recipient, order) = {
    let guard = ctx.read();
    (
      guard.app_state.mailer.clone(),
      guard.user.as_ref().map(|u| (u.email.clone(), u.name.clone())),
      guard.order.clone(),
    )
  };
  let (Some((email, name)), Some(order)) = (recipient, order) else {
    return Ok(Flow::Continue);
  };

  mailer.send_order_confirmation(&email, &name, &order).await?;
  ctx.write().confirmation_sent = true;
  Ok(Flow::Continue)
}
