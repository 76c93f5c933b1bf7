// bazaar/src/web/handlers/webhook_handlers.rs

use actix_web::{web, HttpRequest, HttpResponse};
use conveyor::{Outcome, Shared};
use serde_json::json;
use tracing::{error, info, instrument, warn};

use crate::errors::AppError;
use crate::pipelines::contexts::PaymentWebhookCtxData;
use crate::services::webhook_signature::SIGNATURE_HEADER;
use crate::state::AppState;

/// Provider callback. Any non-2xx answer makes the provider retry, so only
/// real failures (bad signature, bad payload, unknown order) are errors.
#[instrument(name = "handler::payment_webhook", skip(app_state, req, body), fields(payload_len = body.len()))]
pub async fn payment_webhook_handler(
  app_state: web::Data<AppState>,
  req: HttpRequest,
  body: web::Bytes,
) -> Result<HttpResponse, AppError> {
  let signature = req
    .headers()
    .get(SIGNATURE_HEADER)
    .and_then(|value| value.to_str().ok())
    .map(String::from);

  let ctx = Shared::new(PaymentWebhookCtxData::new(app_state.get_ref().clone(), body, signature));

  match app_state.flows.run(ctx.clone()).await {
    Ok(Outcome::Completed) => {
      let guard = ctx.read();
      info!(
        event_kind = ?guard.event_kind(),
        acknowledged = guard.acknowledged,
        "Payment webhook processed."
      );
      Ok(HttpResponse::Ok().json(json!({ "received": true })))
    }
    Ok(Outcome::Halted) => {
      warn!("Payment webhook workflow halted; acknowledging anyway.");
      Ok(HttpResponse::Ok().json(json!({ "received": true })))
    }
    Err(app_err) => {
      error!(error = %app_err, "Payment webhook failed.");
      Err(app_err)
    }
  }
}
