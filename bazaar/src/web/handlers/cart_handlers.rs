// bazaar/src/web/handlers/cart_handlers.rs

use actix_web::{web, HttpResponse};
use conveyor::{Outcome, Shared};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::Role;
use crate::pipelines::contexts::AddToCartCtxData;
use crate::services::cart;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequestPayload {
  pub product_id: Uuid,
  pub quantity: i32,
}

#[derive(Deserialize, Debug)]
pub struct SetQuantityRequestPayload {
  pub quantity: i32,
}

#[instrument(name = "handler::view_cart", skip(app_state, auth_user), fields(user_id = %auth_user.id()))]
pub async fn view_cart_handler(app_state: web::Data<AppState>, auth_user: AuthenticatedUser) -> Result<HttpResponse, AppError> {
  auth_user.require(Role::User)?;
  let view = cart::view(app_state.store.as_ref(), auth_user.id()).await?;
  Ok(HttpResponse::Ok().json(view))
}

#[instrument(
    name = "handler::add_to_cart",
    skip(app_state, req_payload, auth_user),
    fields(user_id = %auth_user.id(), product_id = %req_payload.product_id, quantity = req_payload.quantity)
)]
pub async fn add_to_cart_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<AddToCartRequestPayload>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  auth_user.require(Role::User)?;
  let ctx = Shared::new(AddToCartCtxData::new(
    app_state.get_ref().clone(),
    auth_user.id(),
    req_payload.product_id,
    req_payload.quantity,
  ));

  match app_state.flows.run(ctx.clone()).await {
    Ok(Outcome::Completed) => {
      let line = ctx.read().updated_line.ok_or_else(|| {
        warn!("Add-to-cart completed without an updated line.");
        AppError::Internal("Cart update completed, but the line is unavailable.".to_string())
      })?;
      info!(quantity = line.quantity, "Item added to cart.");
      Ok(HttpResponse::Ok().json(json!({
          "message": "Item added to cart.",
          "cartItem": line,
      })))
    }
    Ok(Outcome::Halted) => Err(AppError::Internal("Adding to the cart was halted.".to_string())),
    Err(app_err) => {
      warn!(error = %app_err, "Add to cart failed.");
      Err(app_err)
    }
  }
}

#[instrument(name = "handler::set_cart_quantity", skip(app_state, auth_user, req_payload), fields(user_id = %auth_user.id(), product_id = %path))]
pub async fn set_cart_quantity_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
  req_payload: web::Json<SetQuantityRequestPayload>,
) -> Result<HttpResponse, AppError> {
  auth_user.require(Role::User)?;
  let view = cart::set_quantity(
    app_state.store.as_ref(),
    auth_user.id(),
    path.into_inner(),
    req_payload.quantity,
  )
  .await?;
  Ok(HttpResponse::Ok().json(view))
}

#[instrument(name = "handler::remove_cart_line", skip(app_state, auth_user), fields(user_id = %auth_user.id(), product_id = %path))]
pub async fn remove_cart_line_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  auth_user.require(Role::User)?;
  let view = cart::remove_line(app_state.store.as_ref(), auth_user.id(), path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(view))
}

#[instrument(name = "handler::clear_cart", skip(app_state, auth_user), fields(user_id = %auth_user.id()))]
pub async fn clear_cart_handler(app_state: web::Data<AppState>, auth_user: AuthenticatedUser) -> Result<HttpResponse, AppError> {
  auth_user.require(Role::User)?;
  cart::clear(app_state.store.as_ref(), auth_user.id()).await?;
  Ok(HttpResponse::NoContent().finish())
}
