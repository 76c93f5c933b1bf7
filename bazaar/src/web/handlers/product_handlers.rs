// bazaar/src/web/handlers/product_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{ReviewInput, Role};
use crate::services::catalog;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

#[derive(Deserialize, Debug, Default)]
pub struct ProductListQuery {
  pub search: Option<String>,
  pub vendor_id: Option<Uuid>,
}

#[instrument(name = "handler::list_products", skip(app_state))]
pub async fn list_products_handler(
  app_state: web::Data<AppState>,
  query: web::Query<ProductListQuery>,
) -> Result<HttpResponse, AppError> {
  let query = query.into_inner();
  let products = catalog::public_products(app_state.store.as_ref(), query.search, query.vendor_id).await?;
  info!(count = products.len(), "Public catalog listed.");
  Ok(HttpResponse::Ok().json(products))
}

#[instrument(name = "handler::get_product", skip(app_state), fields(product_id = %path))]
pub async fn get_product_handler(app_state: web::Data<AppState>, path: web::Path<Uuid>) -> Result<HttpResponse, AppError> {
  let product = catalog::public_product(app_state.store.as_ref(), path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(json!({
      "product": product,
      "averageRating": product.average_rating(),
  })))
}

#[instrument(name = "handler::add_review", skip(app_state, auth_user, req_payload), fields(user_id = %auth_user.id(), product_id = %path))]
pub async fn add_review_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
  req_payload: web::Json<ReviewInput>,
) -> Result<HttpResponse, AppError> {
  auth_user.require(Role::User)?;
  let review = catalog::add_review(
    app_state.store.as_ref(),
    &auth_user.claims,
    path.into_inner(),
    req_payload.into_inner(),
  )
  .await?;
  Ok(HttpResponse::Created().json(review))
}
