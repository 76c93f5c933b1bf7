// bazaar/src/services/order_lifecycle.rs

//! Fulfillment transitions after checkout and the per-role order listings.
//! Every transition is checked by `OrderStatus::can_transition_to`.

use crate::errors::{AppError, Result};
use crate::models::{Order, OrderStatus, PaymentMethod, PaymentStatus, Role};
use crate::services::session::SessionClaims;
use crate::store::{OrderFilter, Store};
use tracing::{info, instrument};
use uuid::Uuid;

async fn load_order(store: &dyn Store, order_id: Uuid) -> Result<Order> {
  store
    .order_by_id(order_id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Order {} not found.", order_id)))
}

/// Owning customer or any admin. Quantities go back to stock in the same
/// store operation as the status change.
#[instrument(name = "order_lifecycle::cancel", skip(store, actor), fields(order_id = %order_id, actor_id = %actor.sub, role = %actor.role), err(Display))]
pub async fn cancel(store: &dyn Store, actor: &SessionClaims, order_id: Uuid) -> Result<Order> {
  let mut order = load_order(store, order_id).await?;
  if actor.role != Role::Admin && order.user_id != actor.sub {
    return Err(AppError::Forbidden("You can only cancel your own orders.".to_string()));
  }
  order.transition_to(OrderStatus::Cancelled)?;
  store.cancel_order(&order).await?;
  info!("Order cancelled and stock restored.");
  load_order(store, order_id).await
}

/// Confirm or ship on behalf of a vendor that sells at least one line of the
/// order. The status write only lands if nobody moved the order meanwhile.
#[instrument(name = "order_lifecycle::advance_as_vendor", skip(store), err(Display))]
pub async fn advance_as_vendor(store: &dyn Store, vendor_id: Uuid, order_id: Uuid, next: OrderStatus) -> Result<Order> {
  let mut order = load_order(store, order_id).await?;
  if !order.involves_vendor(vendor_id) {
    return Err(AppError::Forbidden("This order contains none of your products.".to_string()));
  }
  let from = order.status;
  order.transition_to(next)?;
  store.advance_order(order_id, from, next).await?;
  info!(status = %next, "Order advanced by vendor.");
  load_order(store, order_id).await
}

/// Cash is collected at the door, so a COD order is paid once delivered.
#[instrument(name = "order_lifecycle::deliver", skip(store), err(Display))]
pub async fn deliver(store: &dyn Store, order_id: Uuid) -> Result<Order> {
  let mut order = load_order(store, order_id).await?;
  let from = order.status;
  order.transition_to(OrderStatus::Delivered)?;
  store.advance_order(order_id, from, OrderStatus::Delivered).await?;
  if order.payment_method == PaymentMethod::Cod {
    store.settle_payment(order_id, PaymentStatus::Paid, None).await?;
  }
  let order = load_order(store, order_id).await?;
  info!(payment_status = %order.payment_status.as_str(), "Order delivered.");
  Ok(order)
}

pub async fn customer_orders(store: &dyn Store, user_id: Uuid) -> Result<Vec<Order>> {
  store
    .list_orders(&OrderFilter {
      user_id: Some(user_id),
      ..Default::default()
    })
    .await
}

/// Another customer's order is reported as missing.
pub async fn customer_order(store: &dyn Store, user_id: Uuid, order_id: Uuid) -> Result<Order> {
  let order = load_order(store, order_id).await?;
  if order.user_id != user_id {
    return Err(AppError::NotFound(format!("Order {} not found.", order_id)));
  }
  Ok(order)
}

pub async fn vendor_orders(store: &dyn Store, vendor_id: Uuid) -> Result<Vec<Order>> {
  store
    .list_orders(&OrderFilter {
      vendor_id: Some(vendor_id),
      ..Default::default()
    })
    .await
}

pub async fn delivery_queue(store: &dyn Store) -> Result<Vec<Order>> {
  store
    .list_orders(&OrderFilter {
      status: Some(OrderStatus::Shipped),
      ..Default::default()
    })
    .await
}

pub async fn all_orders(store: &dyn Store, status: Option<OrderStatus>) -> Result<Vec<Order>> {
  store
    .list_orders(&OrderFilter {
      status,
      ..Default::default()
    })
    .await
}
