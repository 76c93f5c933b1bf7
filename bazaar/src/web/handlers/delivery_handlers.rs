// bazaar/src/web/handlers/delivery_handlers.rs

use actix_web::{web, HttpResponse};
use tracing::instrument;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::Role;
use crate::services::order_lifecycle;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

#[instrument(name = "handler::delivery_queue", skip(app_state, auth_user), fields(agent_id = %auth_user.id()))]
pub async fn delivery_queue_handler(app_state: web::Data<AppState>, auth_user: AuthenticatedUser) -> Result<HttpResponse, AppError> {
  auth_user.require(Role::DeliveryGuy)?;
  let orders = order_lifecycle::delivery_queue(app_state.store.as_ref()).await?;
  Ok(HttpResponse::Ok().json(orders))
}

#[instrument(name = "handler::deliver_order", skip(app_state, auth_user), fields(agent_id = %auth_user.id(), order_id = %path))]
pub async fn deliver_order_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  auth_user.require(Role::DeliveryGuy)?;
  let order = order_lifecycle::deliver(app_state.store.as_ref(), path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(order))
}
