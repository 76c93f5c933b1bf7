// bazaar/src/pipelines/payment_flows.rs

//! Sub-workflows for the `initiate_payment` branch of checkout.

use crate::errors::{AppError, Result as AppResult};
use crate::models::PaymentStatus;
use crate::pipelines::contexts::PaymentCtxData;
use crate::services::payment_gateway::CheckoutSessionRequest;
use conveyor::{Flow, Shared, StepSpec, Workflow};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info};

/// COD needs no provider call: payment stays `Pending` until delivery.
pub fn cod_payment_flow() -> Arc<Workflow<PaymentCtxData, AppError>> {
  let mut flow = Workflow::<PaymentCtxData, AppError>::new("cod_payment", [StepSpec::required("accept_cash_on_delivery")]);

  flow.on("accept_cash_on_delivery", |ctx: Shared<PaymentCtxData>| async move {
    let order_id = ctx.read().order.as_ref().map(|o| o.id);
    if order_id.is_none() {
      return Err(AppError::Internal("Payment context has no order.".to_string()));
    }
    info!(order_id = ?order_id, "Cash on delivery accepted; payment due on delivery.");
    Ok(Flow::Continue)
  });

  Arc::new(flow)
}

pub fn online_payment_flow() -> Arc<Workflow<PaymentCtxData, AppError>> {
  let mut flow = Workflow::<PaymentCtxData, AppError>::new(
    "online_payment",
    [
      StepSpec::required("create_checkout_session"),
      StepSpec::required("attach_session_to_order"),
    ],
  );

  flow.on("create_checkout_session", create_checkout_session);
  flow.on("attach_session_to_order", attach_session_to_order);

  Arc::new(flow)
}

/// A provider failure marks the already placed order `Failed` and ends
/// checkout with 402.
async fn create_checkout_session(ctx: Shared<PaymentCtxData>) -> AppResult<Flow> {
  let (order, customer_email, app_state) = {
    let guard = ctx.read();
    let order = guard
      .order
      .clone()
      .ok_or_else(|| AppError::Internal("Payment context has no order.".to_string()))?;
    (order, guard.customer_email.clone(), guard.app_state.clone())
  };

  let base_url = app_state.config.app_base_url.trim_end_matches('/').to_string();
  let request = CheckoutSessionRequest {
    order_id: order.id,
    amount_cents: order.total_amount_cents,
    currency: app_state.config.currency.clone(),
    customer_email,
    success_url: format!("{}/user/orders/{}?payment=success", base_url, order.id),
    cancel_url: format!("{}/user/orders/{}?payment=cancelled", base_url, order.id),
    metadata: HashMap::from([("order_id".to_string(), order.id.to_string())]),
  };

  match app_state.payments.create_checkout_session(&request).await {
    Ok(session) => {
      info!(order_id = %order.id, session_id = %session.id, "Checkout session ready.");
      ctx.write().session = Some(session);
      Ok(Flow::Continue)
    }
    Err(gateway_err) => {
      error!(order_id = %order.id, error = %gateway_err, "Checkout session creation failed.");
      app_state.store.settle_payment(order.id, PaymentStatus::Failed, None).await?;
      let mut failed = order;
      failed.mark_payment_failed();
      ctx.write().order = Some(failed);
      Err(AppError::Payment(format!(
        "Online payment could not be started: {}",
        gateway_err.public_message()
      )))
    }
  }
}

async fn attach_session_to_order(ctx: Shared<PaymentCtxData>) -> AppResult<Flow> {
  let (mut order, session_id, store) = {
    let guard = ctx.read();
    let order = guard
      .order
      .clone()
      .ok_or_else(|| AppError::Internal("Payment context has no order.".to_string()))?;
    let session_id = guard
      .session
      .as_ref()
      .map(|s| s.id.clone())
      .ok_or_else(|| AppError::Internal("Payment context has no session.".to_string()))?;
    (order, session_id, guard.app_state.store.clone())
  };

  store.attach_payment_session(order.id, &session_id).await?;
  order.payment_session_id = Some(session_id);
  order.updated_at = chrono::Utc::now();
  ctx.write().order = Some(order);
  Ok(Flow::Continue)
}
