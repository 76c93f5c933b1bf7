// bazaar/src/web/handlers/admin_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{ModerationDecision, OrderStatus, Role, VerificationStatus};
use crate::services::{accounts, moderation, order_lifecycle, reporting};
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

#[derive(Deserialize, Debug, Default)]
pub struct StatusQuery {
  pub status: Option<String>,
}

impl StatusQuery {
  fn parsed<T: std::str::FromStr<Err = AppError>>(&self) -> Result<Option<T>, AppError> {
    self
      .status
      .as_deref()
      .map(str::trim)
      .filter(|s| !s.is_empty())
      .map(str::parse::<T>)
      .transpose()
  }
}

#[derive(Deserialize, Debug)]
pub struct ModerationRequestPayload {
  pub status: String,
  pub reason: Option<String>,
}

impl ModerationRequestPayload {
  fn decision(&self) -> Result<ModerationDecision, AppError> {
    let status: VerificationStatus = self.status.trim().parse()?;
    ModerationDecision::from_request(status, self.reason.as_deref())
  }
}

#[derive(Deserialize, Debug)]
pub struct DeliveryAgentRequestPayload {
  pub name: String,
  pub email: String,
  pub password: String,
}

#[instrument(name = "handler::admin_vendors", skip(app_state, auth_user, query), fields(status = ?query.status))]
pub async fn list_vendors_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  query: web::Query<StatusQuery>,
) -> Result<HttpResponse, AppError> {
  auth_user.require(Role::Admin)?;
  let vendors = moderation::list_vendors(app_state.store.as_ref(), query.parsed()?).await?;
  Ok(HttpResponse::Ok().json(vendors))
}

#[instrument(name = "handler::decide_vendor", skip(app_state, auth_user, req_payload), fields(vendor_id = %path, status = %req_payload.status))]
pub async fn decide_vendor_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
  req_payload: web::Json<ModerationRequestPayload>,
) -> Result<HttpResponse, AppError> {
  auth_user.require(Role::Admin)?;
  let decision = req_payload.decision()?;
  let vendor = moderation::decide_vendor(app_state.store.as_ref(), path.into_inner(), decision).await?;
  info!(admin_id = %auth_user.id(), "Vendor shop decision recorded.");
  Ok(HttpResponse::Ok().json(vendor))
}

#[instrument(name = "handler::admin_products", skip(app_state, auth_user, query), fields(status = ?query.status))]
pub async fn list_products_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  query: web::Query<StatusQuery>,
) -> Result<HttpResponse, AppError> {
  auth_user.require(Role::Admin)?;
  let products = moderation::list_products(app_state.store.as_ref(), query.parsed()?).await?;
  Ok(HttpResponse::Ok().json(products))
}

#[instrument(name = "handler::decide_product", skip(app_state, auth_user, req_payload), fields(product_id = %path, status = %req_payload.status))]
pub async fn decide_product_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
  req_payload: web::Json<ModerationRequestPayload>,
) -> Result<HttpResponse, AppError> {
  auth_user.require(Role::Admin)?;
  let decision = req_payload.decision()?;
  let product = moderation::decide_product(app_state.store.as_ref(), path.into_inner(), decision).await?;
  info!(admin_id = %auth_user.id(), "Product decision recorded.");
  Ok(HttpResponse::Ok().json(product))
}

#[instrument(name = "handler::admin_orders", skip(app_state, auth_user, query), fields(status = ?query.status))]
pub async fn list_orders_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  query: web::Query<StatusQuery>,
) -> Result<HttpResponse, AppError> {
  auth_user.require(Role::Admin)?;
  let status: Option<OrderStatus> = query.parsed()?;
  let orders = order_lifecycle::all_orders(app_state.store.as_ref(), status).await?;
  Ok(HttpResponse::Ok().json(orders))
}

#[instrument(name = "handler::admin_cancel_order", skip(app_state, auth_user), fields(order_id = %path))]
pub async fn cancel_order_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  auth_user.require(Role::Admin)?;
  let order = order_lifecycle::cancel(app_state.store.as_ref(), &auth_user.claims, path.into_inner()).await?;
  info!(admin_id = %auth_user.id(), "Order cancelled by admin.");
  Ok(HttpResponse::Ok().json(json!({
      "message": "Order cancelled.",
      "order": order,
  })))
}

#[instrument(name = "handler::create_delivery_agent", skip(app_state, auth_user, req_payload))]
pub async fn create_delivery_agent_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  req_payload: web::Json<DeliveryAgentRequestPayload>,
) -> Result<HttpResponse, AppError> {
  auth_user.require(Role::Admin)?;
  let payload = req_payload.into_inner();
  let agent = accounts::create_delivery_agent(app_state.store.as_ref(), &payload.name, &payload.email, &payload.password).await?;
  Ok(HttpResponse::Created().json(agent))
}

#[instrument(name = "handler::admin_stats", skip(app_state, auth_user))]
pub async fn stats_handler(app_state: web::Data<AppState>, auth_user: AuthenticatedUser) -> Result<HttpResponse, AppError> {
  auth_user.require(Role::Admin)?;
  let stats = reporting::marketplace_stats(app_state.store.as_ref()).await?;
  Ok(HttpResponse::Ok().json(stats))
}
