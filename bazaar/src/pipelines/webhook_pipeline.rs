// bazaar/src/pipelines/webhook_pipeline.rs

//! Payment provider webhooks: signature check, event parsing, then a branch
//! that settles the referenced order as paid or failed.

use crate::errors::{AppError, Result as AppResult};
use crate::models::PaymentStatus;
use crate::pipelines::contexts::{PaymentEvent, PaymentEventKind, PaymentWebhookCtxData, SettlementCtxData};
use crate::services::webhook_signature;
use conveyor::{Flow, FlowError, Registry, Shared, StepSpec, Workflow};
use std::sync::Arc;
use tracing::{event, info, warn, Level};
use uuid::Uuid;

pub fn register_payment_webhook_pipeline(registry: &Registry<AppError>) {
  let mut p = Workflow::<PaymentWebhookCtxData, AppError>::new(
    "payment_webhook",
    [
      StepSpec::required("verify_signature").skip_if(|ctx: Shared<PaymentWebhookCtxData>| {
        let unsigned = ctx.read().app_state.config.payment_webhook_secret.is_none();
        if unsigned {
          warn!("PAYMENT_WEBHOOK_SECRET is not set; accepting an unsigned webhook.");
        }
        unsigned
      }),
      StepSpec::required("parse_event"),
      StepSpec::required("route_event"),
      StepSpec::required("acknowledge"),
    ],
  );

  p.on("verify_signature", verify_signature);
  p.on("parse_event", parse_event);

  let settlement = |ctx: Shared<PaymentWebhookCtxData>| {
    ctx
      .read()
      .settlement
      .clone()
      .ok_or_else(|| FlowError::projection("route_event", "no order was loaded for this event"))
  };
  p.branch("route_event")
    .route(
      "settle_paid",
      |ctx: Shared<PaymentWebhookCtxData>| ctx.read().event_kind() == Some(PaymentEventKind::Completed),
      settle_paid_flow(),
      settlement,
    )
    .route(
      "settle_failed",
      |ctx: Shared<PaymentWebhookCtxData>| ctx.read().event_kind() == Some(PaymentEventKind::Failed),
      settle_failed_flow(),
      settlement,
    )
    .otherwise(Flow::Continue)
    .finish();

  p.on("acknowledge", |ctx: Shared<PaymentWebhookCtxData>| async move {
    let mut guard = ctx.write();
    guard.acknowledged = true;
    let event_type = guard.event.as_ref().map(|e| e.event_type.clone()).unwrap_or_default();
    info!(%event_type, "Payment webhook acknowledged.");
    Ok::<_, AppError>(Flow::Continue)
  });

  registry.register(p);
  info!("Payment webhook workflow registered.");
}

async fn verify_signature(ctx: Shared<PaymentWebhookCtxData>) -> AppResult<Flow> {
  let guard = ctx.read();
  let Some(secret) = guard.app_state.config.payment_webhook_secret.as_deref() else {
    return Ok(Flow::Continue);
  };
  let valid = guard
    .signature
    .as_deref()
    .is_some_and(|sig| webhook_signature::verify(secret, &guard.raw_body, sig));
  if !valid {
    warn!(has_signature = guard.signature.is_some(), "Webhook signature rejected.");
    return Err(AppError::Auth("Invalid webhook signature.".to_string()));
  }
  Ok(Flow::Continue)
}

/// Settling events must name an existing order in `metadata.order_id`.
async fn parse_event(ctx: Shared<PaymentWebhookCtxData>) -> AppResult<Flow> {
  let (body, app_state) = {
    let guard = ctx.read();
    (guard.raw_body.clone(), guard.app_state.clone())
  };

  let event: PaymentEvent = serde_json::from_slice(&body)
    .map_err(|e| AppError::Validation(format!("Malformed webhook payload: {}", e)))?;
  event!(Level::DEBUG, event_type = %event.event_type, "Webhook event parsed.");

  let settlement = if event.kind() == PaymentEventKind::Other {
    None
  } else {
    let raw_id = event
      .metadata
      .order_id
      .as_deref()
      .ok_or_else(|| AppError::Validation("Webhook event has no metadata.order_id.".to_string()))?;
    let order_id = Uuid::parse_str(raw_id)
      .map_err(|_| AppError::Validation(format!("Webhook order id '{}' is not a valid id.", raw_id)))?;
    let order = app_state
      .store
      .order_by_id(order_id)
      .await?
      .ok_or_else(|| AppError::NotFound(format!("Order {} not found.", order_id)))?;

    if let (Some(stored), Some(received)) = (order.payment_session_id.as_deref(), event.session_id.as_deref()) {
      if stored != received {
        warn!(%order_id, stored, received, "Webhook session id differs from the one stored on the order.");
      }
    }
    Some(Shared::new(SettlementCtxData {
      app_state,
      order,
      session_id: event.session_id.clone(),
      changed: false,
    }))
  };

  let mut guard = ctx.write();
  guard.event = Some(event);
  guard.settlement = settlement;
  Ok(Flow::Continue)
}

fn settle_paid_flow() -> Arc<Workflow<SettlementCtxData, AppError>> {
  let mut flow = Workflow::<SettlementCtxData, AppError>::new("settle_paid", [StepSpec::required("mark_order_paid")]);
  flow.on("mark_order_paid", mark_order_paid);
  Arc::new(flow)
}

fn settle_failed_flow() -> Arc<Workflow<SettlementCtxData, AppError>> {
  let mut flow = Workflow::<SettlementCtxData, AppError>::new("settle_failed", [StepSpec::required("mark_payment_failed")]);
  flow.on("mark_payment_failed", mark_payment_failed);
  Arc::new(flow)
}

/// Replayed events leave an already paid order untouched. Only the payment
/// status is written, so a concurrent cancel or fulfilment step is never undone.
async fn mark_order_paid(ctx: Shared<SettlementCtxData>) -> AppResult<Flow> {
  let (order_id, session_id, store) = {
    let guard = ctx.read();
    if guard.order.payment_status == PaymentStatus::Paid {
      event!(Level::DEBUG, order_id = %guard.order.id, "Order already paid; nothing to settle.");
      return Ok(Flow::Continue);
    }
    (guard.order.id, guard.session_id.clone(), guard.app_state.store.clone())
  };

  if !store.settle_payment(order_id, PaymentStatus::Paid, session_id.as_deref()).await? {
    event!(Level::DEBUG, %order_id, "Order was paid meanwhile; nothing to settle.");
    return Ok(Flow::Continue);
  }
  let mut guard = ctx.write();
  guard.order.mark_paid();
  if guard.order.payment_session_id.is_none() {
    guard.order.payment_session_id = session_id;
  }
  guard.changed = true;
  info!(%order_id, "Online payment settled: Paid.");
  Ok(Flow::Continue)
}

async fn mark_payment_failed(ctx: Shared<SettlementCtxData>) -> AppResult<Flow> {
  let (order_id, already_paid, store) = {
    let guard = ctx.read();
    (
      guard.order.id,
      guard.order.payment_status == PaymentStatus::Paid,
      guard.app_state.store.clone(),
    )
  };

  if already_paid || !store.settle_payment(order_id, PaymentStatus::Failed, None).await? {
    warn!(%order_id, "Failure event for a paid order ignored.");
    return Ok(Flow::Continue);
  }
  let mut guard = ctx.write();
  guard.order.mark_payment_failed();
  guard.changed = true;
  info!(%order_id, "Online payment settled: Failed.");
  Ok(Flow::Continue)
}
