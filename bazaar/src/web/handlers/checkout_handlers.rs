// bazaar/src/web/handlers/checkout_handlers.rs

use actix_web::{web, HttpResponse};
use conveyor::{Outcome, Shared};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::models::{PaymentMethod, Role, ShippingAddress};
use crate::pipelines::contexts::CheckoutCtxData;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequestPayload {
  pub shipping_address: ShippingAddress,
  pub payment_method: String,
}

#[instrument(
    name = "handler::checkout",
    skip(app_state, auth_user, req_payload),
    fields(user_id = %auth_user.id(), payment_method = %req_payload.payment_method)
)]
pub async fn checkout_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  req_payload: web::Json<CheckoutRequestPayload>,
) -> Result<HttpResponse, AppError> {
  auth_user.require(Role::User)?;
  let payload = req_payload.into_inner();
  let payment_method: PaymentMethod = payload.payment_method.trim().parse()?;

  let ctx = Shared::new(CheckoutCtxData::new(
    app_state.get_ref().clone(),
    auth_user.id(),
    payload.shipping_address,
    payment_method,
  ));

  match app_state.flows.run(ctx.clone()).await {
    Ok(Outcome::Completed) => {
      let guard = ctx.read();
      let order = guard.order.as_ref().ok_or_else(|| {
        warn!("Checkout completed without an order.");
        AppError::Internal("Checkout completed, but the order is unavailable.".to_string())
      })?;
      info!(
        order_id = %order.id,
        total = order.total_amount_cents,
        confirmation_sent = guard.confirmation_sent,
        "Checkout completed."
      );

      match order.payment_method {
        PaymentMethod::Cod => Ok(HttpResponse::Created().json(json!({
            "message": "Order placed. Pay on delivery.",
            "order": order,
        }))),
        PaymentMethod::Online => {
          let redirect_url = guard
            .redirect_url
            .as_ref()
            .ok_or_else(|| AppError::Internal("Online checkout finished without a redirect URL.".to_string()))?;
          Ok(HttpResponse::Created().json(json!({
              "order": order,
              "redirectUrl": redirect_url,
          })))
        }
      }
    }
    Ok(Outcome::Halted) => {
      warn!("Checkout halted: no payment route matched.");
      Err(AppError::Internal("Checkout was halted before payment.".to_string()))
    }
    Err(app_err) => {
      warn!(error = %app_err, "Checkout failed.");
      Err(app_err)
    }
  }
}
