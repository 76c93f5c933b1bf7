// bazaar/src/web/handlers/order_handlers.rs

//! Customer-facing order endpoints.

use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::Role;
use crate::services::order_lifecycle;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

#[instrument(name = "handler::my_orders", skip(app_state, auth_user), fields(user_id = %auth_user.id()))]
pub async fn list_my_orders_handler(app_state: web::Data<AppState>, auth_user: AuthenticatedUser) -> Result<HttpResponse, AppError> {
  auth_user.require(Role::User)?;
  let orders = order_lifecycle::customer_orders(app_state.store.as_ref(), auth_user.id()).await?;
  Ok(HttpResponse::Ok().json(orders))
}

#[instrument(name = "handler::my_order", skip(app_state, auth_user), fields(user_id = %auth_user.id(), order_id = %path))]
pub async fn get_my_order_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  auth_user.require(Role::User)?;
  let order = order_lifecycle::customer_order(app_state.store.as_ref(), auth_user.id(), path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(order))
}

#[instrument(name = "handler::cancel_my_order", skip(app_state, auth_user), fields(user_id = %auth_user.id(), order_id = %path))]
pub async fn cancel_my_order_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  auth_user.require(Role::User)?;
  let order = order_lifecycle::cancel(app_state.store.as_ref(), &auth_user.claims, path.into_inner()).await?;
  info!(order_id = %order.id, "Order cancelled by customer.");
  Ok(HttpResponse::Ok().json(json!({
      "message": "Order cancelled.",
      "order": order,
  })))
}
