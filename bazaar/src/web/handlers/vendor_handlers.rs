// bazaar/src/web/handlers/vendor_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{OrderStatus, ProductDraft, Role, ShopDetails};
use crate::services::{catalog, moderation, order_lifecycle};
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SetActiveRequestPayload {
  pub is_active: bool,
}

#[instrument(name = "handler::submit_shop", skip(app_state, auth_user, req_payload), fields(vendor_id = %auth_user.id()))]
pub async fn submit_shop_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  req_payload: web::Json<ShopDetails>,
) -> Result<HttpResponse, AppError> {
  auth_user.require(Role::Vendor)?;
  let vendor = moderation::submit_shop(app_state.store.as_ref(), auth_user.id(), req_payload.into_inner()).await?;
  Ok(HttpResponse::Ok().json(json!({
      "message": "Shop details submitted for review.",
      "vendor": vendor,
  })))
}

#[instrument(name = "handler::vendor_products", skip(app_state, auth_user), fields(vendor_id = %auth_user.id()))]
pub async fn list_vendor_products_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  auth_user.require(Role::Vendor)?;
  let products = catalog::vendor_products(app_state.store.as_ref(), auth_user.id()).await?;
  Ok(HttpResponse::Ok().json(products))
}

#[instrument(name = "handler::create_product", skip(app_state, auth_user, req_payload), fields(vendor_id = %auth_user.id()))]
pub async fn create_product_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  req_payload: web::Json<ProductDraft>,
) -> Result<HttpResponse, AppError> {
  auth_user.require(Role::Vendor)?;
  let product = catalog::create_product(app_state.store.as_ref(), auth_user.id(), req_payload.into_inner()).await?;
  info!(product_id = %product.id, "Product submitted for review.");
  Ok(HttpResponse::Created().json(product))
}

#[instrument(name = "handler::update_product", skip(app_state, auth_user, req_payload), fields(vendor_id = %auth_user.id(), product_id = %path))]
pub async fn update_product_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
  req_payload: web::Json<ProductDraft>,
) -> Result<HttpResponse, AppError> {
  auth_user.require(Role::Vendor)?;
  let product = catalog::update_product(
    app_state.store.as_ref(),
    auth_user.id(),
    path.into_inner(),
    req_payload.into_inner(),
  )
  .await?;
  Ok(HttpResponse::Ok().json(product))
}

#[instrument(name = "handler::set_product_active", skip(app_state, auth_user, req_payload), fields(vendor_id = %auth_user.id(), product_id = %path))]
pub async fn set_product_active_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
  req_payload: web::Json<SetActiveRequestPayload>,
) -> Result<HttpResponse, AppError> {
  auth_user.require(Role::Vendor)?;
  let product = catalog::set_active(
    app_state.store.as_ref(),
    auth_user.id(),
    path.into_inner(),
    req_payload.is_active,
  )
  .await?;
  Ok(HttpResponse::Ok().json(product))
}

#[instrument(name = "handler::delete_product", skip(app_state, auth_user), fields(vendor_id = %auth_user.id(), product_id = %path))]
pub async fn delete_product_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  auth_user.require(Role::Vendor)?;
  catalog::delete_product(app_state.store.as_ref(), auth_user.id(), path.into_inner()).await?;
  Ok(HttpResponse::NoContent().finish())
}

#[instrument(name = "handler::vendor_orders", skip(app_state, auth_user), fields(vendor_id = %auth_user.id()))]
pub async fn list_vendor_orders_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  auth_user.require(Role::Vendor)?;
  let orders = order_lifecycle::vendor_orders(app_state.store.as_ref(), auth_user.id()).await?;
  Ok(HttpResponse::Ok().json(orders))
}

async fn advance(app_state: &AppState, auth_user: &AuthenticatedUser, order_id: Uuid, next: OrderStatus) -> Result<HttpResponse, AppError> {
  auth_user.require(Role::Vendor)?;
  let order = order_lifecycle::advance_as_vendor(app_state.store.as_ref(), auth_user.id(), order_id, next).await?;
  Ok(HttpResponse::Ok().json(order))
}

#[instrument(name = "handler::confirm_order", skip(app_state, auth_user), fields(vendor_id = %auth_user.id(), order_id = %path))]
pub async fn confirm_order_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  advance(&app_state, &auth_user, path.into_inner(), OrderStatus::Confirmed).await
}

#[instrument(name = "handler::ship_order", skip(app_state, auth_user), fields(vendor_id = %auth_user.id(), order_id = %path))]
pub async fn ship_order_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  advance(&app_state, &auth_user, path.into_inner(), OrderStatus::Shipped).await
}
