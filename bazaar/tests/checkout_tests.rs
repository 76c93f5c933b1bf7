// tests/checkout_tests.rs
mod common;

use bazaar::errors::AppError;
use bazaar::models::{CartLine, Order, OrderLine, OrderStatus, PaymentMethod, PaymentStatus, Role, ShippingAddress};
use bazaar::pipelines::contexts::CheckoutCtxData;
use bazaar::state::AppState;
use bazaar::store::OrderFilter;
use common::*;
use conveyor::{Outcome, Shared};
use std::sync::Arc;
use uuid::Uuid;

async fn place(state: &AppState, user_id: Uuid, method: PaymentMethod) -> (Result<Outcome, AppError>, Shared<CheckoutCtxData>) {
  place_with_address(state, user_id, address(), method).await
}

async fn place_with_address(
  state: &AppState,
  user_id: Uuid,
  shipping: ShippingAddress,
  method: PaymentMethod,
) -> (Result<Outcome, AppError>, Shared<CheckoutCtxData>) {
  let ctx = Shared::new(CheckoutCtxData::new(state.clone(), user_id, shipping, method));
  let result = state.flows.run(ctx.clone()).await;
  (result, ctx)
}

async fn order_count(state: &AppState) -> usize {
  state.store.list_orders(&OrderFilter::default()).await.unwrap().len()
}

#[tokio::test]
async fn cod_checkout_places_order_decrements_stock_and_empties_cart() {
  let state = state();
  let vendor = seed_vendor(&state).await;
  let customer = seed_customer(&state).await;
  let product = seed_product(&state, vendor.id, "Lamp", 500, 5).await;
  fill_cart(&state, customer.id, &[(product.id, 2)]).await;

  let (result, ctx) = place(&state, customer.id, PaymentMethod::Cod).await;
  assert!(matches!(result, Ok(Outcome::Completed)), "{result:?}");

  let order = ctx.read().order.clone().expect("order placed");
  assert_eq!(order.total_amount_cents, 1000);
  assert_eq!(order.status, OrderStatus::Processing);
  assert_eq!(order.payment_status, PaymentStatus::Pending);
  assert_eq!(order.items.len(), 1);
  assert_eq!(order.items[0].vendor_id, vendor.id);
  assert!(ctx.read().redirect_url.is_none());
  assert!(ctx.read().confirmation_sent);

  assert_eq!(stock_of(&state, product.id).await, 3);
  let stored_customer = state.store.user_by_id(customer.id).await.unwrap().unwrap();
  assert!(stored_customer.cart.is_empty());
  assert_eq!(stored_customer.order_ids, vec![order.id]);
  assert_eq!(order_count(&state).await, 1);
}

#[tokio::test]
async fn buying_the_last_unit_clears_availability() {
  let state = state();
  let vendor = seed_vendor(&state).await;
  let customer = seed_customer(&state).await;
  let product = seed_product(&state, vendor.id, "Last one", 900, 1).await;
  fill_cart(&state, customer.id, &[(product.id, 1)]).await;

  let (result, _) = place(&state, customer.id, PaymentMethod::Cod).await;
  assert!(result.is_ok());
  let stored = state.store.product_by_id(product.id).await.unwrap().unwrap();
  assert_eq!(stored.stock, 0);
  assert!(!stored.is_stock_available);
}

#[tokio::test]
async fn insufficient_stock_rejects_everything() {
  let state = state();
  let vendor = seed_vendor(&state).await;
  let customer = seed_customer(&state).await;
  let plenty = seed_product(&state, vendor.id, "Plenty", 100, 10).await;
  let scarce = seed_product(&state, vendor.id, "Scarce", 100, 1).await;
  fill_cart(&state, customer.id, &[(plenty.id, 2), (scarce.id, 3)]).await;

  let (result, ctx) = place(&state, customer.id, PaymentMethod::Cod).await;
  match result {
    Err(AppError::Validation(msg)) => {
      assert!(msg.contains("Scarce"), "{msg}");
      assert!(msg.contains("Insufficient stock"), "{msg}");
    }
    other => panic!("unexpected: {other:?}"),
  }

  assert!(ctx.read().order.is_none());
  assert_eq!(order_count(&state).await, 0);
  assert_eq!(stock_of(&state, plenty.id).await, 10);
  assert_eq!(stock_of(&state, scarce.id).await, 1);
  let stored_customer = state.store.user_by_id(customer.id).await.unwrap().unwrap();
  assert_eq!(stored_customer.cart.len(), 2);
}

#[tokio::test]
async fn inactive_product_rejects_checkout() {
  let state = state();
  let vendor = seed_vendor(&state).await;
  let customer = seed_customer(&state).await;
  let mut product = seed_product(&state, vendor.id, "Retired", 100, 10).await;
  product.is_active = false;
  state.store.save_product(&product).await.unwrap();
  fill_cart(&state, customer.id, &[(product.id, 1)]).await;

  let (result, _) = place(&state, customer.id, PaymentMethod::Cod).await;
  match result {
    Err(AppError::Validation(msg)) => assert!(msg.contains("Retired"), "{msg}"),
    other => panic!("unexpected: {other:?}"),
  }
  assert_eq!(stock_of(&state, product.id).await, 10);
  assert_eq!(order_count(&state).await, 0);
}

#[tokio::test]
async fn deleted_product_rejects_checkout() {
  let state = state();
  let customer = seed_customer(&state).await;
  fill_cart(&state, customer.id, &[(Uuid::new_v4(), 1)]).await;

  let (result, _) = place(&state, customer.id, PaymentMethod::Cod).await;
  match result {
    Err(AppError::Validation(msg)) => assert!(msg.contains("no longer exists"), "{msg}"),
    other => panic!("unexpected: {other:?}"),
  }
}

#[tokio::test]
async fn empty_cart_is_rejected() {
  let state = state();
  let customer = seed_customer(&state).await;

  let (result, _) = place(&state, customer.id, PaymentMethod::Cod).await;
  match result {
    Err(AppError::Validation(msg)) => assert_eq!(msg, "Your cart is empty."),
    other => panic!("unexpected: {other:?}"),
  }
}

#[tokio::test]
async fn blank_street_is_rejected_before_the_cart_is_read() {
  let state = state();
  let vendor = seed_vendor(&state).await;
  let customer = seed_customer(&state).await;
  let product = seed_product(&state, vendor.id, "Lamp", 500, 5).await;
  fill_cart(&state, customer.id, &[(product.id, 1)]).await;

  let shipping = ShippingAddress {
    street: "   ".into(),
    ..address()
  };
  let (result, ctx) = place_with_address(&state, customer.id, shipping, PaymentMethod::Cod).await;
  match result {
    Err(AppError::Validation(msg)) => assert!(msg.contains("street"), "{msg}"),
    other => panic!("unexpected: {other:?}"),
  }
  assert!(ctx.read().user.is_none());
  assert_eq!(stock_of(&state, product.id).await, 5);
}

#[tokio::test]
async fn online_checkout_returns_redirect_and_records_session() {
  let state = state();
  let vendor = seed_vendor(&state).await;
  let customer = seed_customer(&state).await;
  let product = seed_product(&state, vendor.id, "Desk", 12_000, 2).await;
  fill_cart(&state, customer.id, &[(product.id, 1)]).await;

  let (result, ctx) = place(&state, customer.id, PaymentMethod::Online).await;
  assert!(matches!(result, Ok(Outcome::Completed)), "{result:?}");

  let (order, redirect) = {
    let guard = ctx.read();
    (guard.order.clone().unwrap(), guard.redirect_url.clone().unwrap())
  };
  let session_id = order.payment_session_id.clone().expect("session stored on order");
  assert_eq!(redirect, format!("{}/{}", CHECKOUT_URL, session_id));
  assert_eq!(order.payment_status, PaymentStatus::Pending);

  let stored = state.store.order_by_id(order.id).await.unwrap().unwrap();
  assert_eq!(stored.payment_session_id.as_deref(), Some(session_id.as_str()));
  assert_eq!(stock_of(&state, product.id).await, 1);
}

#[tokio::test]
async fn failed_session_marks_payment_failed() {
  let state = state_with_gateway(Arc::new(FailingGateway));
  let vendor = seed_vendor(&state).await;
  let customer = seed_customer(&state).await;
  let product = seed_product(&state, vendor.id, "Desk", 12_000, 2).await;
  fill_cart(&state, customer.id, &[(product.id, 1)]).await;

  let (result, _) = place(&state, customer.id, PaymentMethod::Online).await;
  match result {
    Err(AppError::Payment(msg)) => assert!(msg.contains("Provider unavailable"), "{msg}"),
    other => panic!("unexpected: {other:?}"),
  }

  let orders = state.store.list_orders(&OrderFilter::default()).await.unwrap();
  assert_eq!(orders.len(), 1);
  assert_eq!(orders[0].payment_status, PaymentStatus::Failed);
  assert_eq!(orders[0].status, OrderStatus::Processing);
}

#[tokio::test]
async fn undeliverable_confirmation_does_not_fail_checkout() {
  let state = state();
  let vendor = seed_vendor(&state).await;
  let customer = seed_user(&state, Role::User, "nobody@mail.invalid").await;
  let product = seed_product(&state, vendor.id, "Lamp", 500, 5).await;
  fill_cart(&state, customer.id, &[(product.id, 1)]).await;

  let (result, ctx) = place(&state, customer.id, PaymentMethod::Cod).await;
  assert!(matches!(result, Ok(Outcome::Completed)), "{result:?}");
  assert!(!ctx.read().confirmation_sent);
  assert_eq!(order_count(&state).await, 1);
}

#[tokio::test]
async fn concurrent_checkouts_never_oversell() {
  let state = state();
  let vendor = seed_vendor(&state).await;
  let product = seed_product(&state, vendor.id, "Hot item", 100, 3).await;

  let mut customers = Vec::new();
  for _ in 0..4 {
    let customer = seed_customer(&state).await;
    fill_cart(&state, customer.id, &[(product.id, 2)]).await;
    customers.push(customer.id);
  }

  let handles: Vec<_> = customers
    .into_iter()
    .map(|id| {
      let state = state.clone();
      tokio::spawn(async move { place(&state, id, PaymentMethod::Cod).await.0.is_ok() })
    })
    .collect();

  let mut placed = 0;
  for handle in handles {
    if handle.await.unwrap() {
      placed += 1;
    }
  }

  assert_eq!(placed, 1);
  assert_eq!(stock_of(&state, product.id).await, 1);
  assert_eq!(order_count(&state).await, 1);
}

#[tokio::test]
async fn commit_leaves_cart_lines_that_were_not_ordered() {
  let state = state();
  let vendor = seed_vendor(&state).await;
  let customer = seed_customer(&state).await;
  let kettle = seed_product(&state, vendor.id, "Kettle", 2_500, 5).await;
  let toaster = seed_product(&state, vendor.id, "Toaster", 3_000, 5).await;
  // The toaster line lands after the cart was read for this order.
  fill_cart(&state, customer.id, &[(kettle.id, 1), (toaster.id, 2)]).await;

  let line = OrderLine {
    product_id: kettle.id,
    vendor_id: vendor.id,
    title: kettle.title.clone(),
    quantity: 1,
    price_cents: kettle.price_cents,
  };
  let order = Order::new(customer.id, vec![line], address(), PaymentMethod::Cod);
  state.store.commit_checkout(&order).await.unwrap();

  let buyer = state.store.user_by_id(customer.id).await.unwrap().unwrap();
  assert_eq!(
    buyer.cart,
    vec![CartLine {
      product_id: toaster.id,
      quantity: 2,
    }]
  );
  assert_eq!(buyer.order_ids, vec![order.id]);
  assert_eq!(stock_of(&state, kettle.id).await, 4);
  assert_eq!(stock_of(&state, toaster.id).await, 5);
}
