// tests/webhook_tests.rs
mod common;

use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use bazaar::models::{Order, OrderStatus, PaymentMethod, PaymentStatus};
use bazaar::pipelines::contexts::{CheckoutCtxData, PaymentWebhookCtxData};
use bazaar::services::order_lifecycle;
use bazaar::services::webhook_signature::{self, SIGNATURE_HEADER};
use bazaar::state::AppState;
use bazaar::web::configure_app_routes;
use common::*;
use conveyor::Shared;
use serde_json::{json, Value};
use uuid::Uuid;

const WEBHOOK_URI: &str = "/api/v1/webhooks/payments";

async fn online_order(state: &AppState) -> Order {
  let vendor = seed_vendor(state).await;
  let customer = seed_customer(state).await;
  let product = seed_product(state, vendor.id, "Headphones", 8_000, 3).await;
  fill_cart(state, customer.id, &[(product.id, 1)]).await;
  let ctx = Shared::new(CheckoutCtxData::new(state.clone(), customer.id, address(), PaymentMethod::Online));
  state.flows.run(ctx.clone()).await.expect("checkout succeeds");
  let order = ctx.read().order.clone().expect("order placed");
  order
}

fn event_body(event_type: &str, order: &Order) -> Vec<u8> {
  serde_json::to_vec(&json!({
      "event_type": event_type,
      "session_id": order.payment_session_id,
      "metadata": { "order_id": order.id.to_string() },
  }))
  .unwrap()
}

async fn payment_status(state: &AppState, order_id: Uuid) -> PaymentStatus {
  state.store.order_by_id(order_id).await.unwrap().unwrap().payment_status
}

#[actix_web::test]
async fn signed_completion_marks_order_paid() {
  let state = state_with_webhook_secret();
  let order = online_order(&state).await;
  let app = test::init_service(App::new().app_data(web::Data::new(state.clone())).configure(configure_app_routes)).await;

  let body = event_body("checkout.session.completed", &order);
  let req = test::TestRequest::post()
    .uri(WEBHOOK_URI)
    .insert_header((SIGNATURE_HEADER, webhook_signature::sign(WEBHOOK_SECRET, &body)))
    .set_payload(body)
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let json: Value = test::read_body_json(resp).await;
  assert_eq!(json["received"], true);

  assert_eq!(payment_status(&state, order.id).await, PaymentStatus::Paid);
}

#[actix_web::test]
async fn replayed_completion_is_harmless_and_failure_never_downgrades() {
  let state = state_with_webhook_secret();
  let order = online_order(&state).await;
  let app = test::init_service(App::new().app_data(web::Data::new(state.clone())).configure(configure_app_routes)).await;

  for event_type in ["checkout.session.completed", "checkout.session.completed", "payment.failed"] {
    let body = event_body(event_type, &order);
    let req = test::TestRequest::post()
      .uri(WEBHOOK_URI)
      .insert_header((SIGNATURE_HEADER, webhook_signature::sign(WEBHOOK_SECRET, &body)))
      .set_payload(body)
      .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
  }

  assert_eq!(payment_status(&state, order.id).await, PaymentStatus::Paid);
}

#[actix_web::test]
async fn expired_session_marks_payment_failed() {
  let state = state_with_webhook_secret();
  let order = online_order(&state).await;
  let app = test::init_service(App::new().app_data(web::Data::new(state.clone())).configure(configure_app_routes)).await;

  let body = event_body("checkout.session.expired", &order);
  let req = test::TestRequest::post()
    .uri(WEBHOOK_URI)
    .insert_header((SIGNATURE_HEADER, webhook_signature::sign(WEBHOOK_SECRET, &body)))
    .set_payload(body)
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
  assert_eq!(payment_status(&state, order.id).await, PaymentStatus::Failed);
}

#[actix_web::test]
async fn bad_or_missing_signature_is_rejected() {
  let state = state_with_webhook_secret();
  let order = online_order(&state).await;
  let app = test::init_service(App::new().app_data(web::Data::new(state.clone())).configure(configure_app_routes)).await;
  let body = event_body("checkout.session.completed", &order);

  let unsigned = test::TestRequest::post()
    .uri(WEBHOOK_URI)
    .set_payload(body.clone())
    .to_request();
  assert_eq!(test::call_service(&app, unsigned).await.status(), StatusCode::UNAUTHORIZED);

  let forged = test::TestRequest::post()
    .uri(WEBHOOK_URI)
    .insert_header((SIGNATURE_HEADER, webhook_signature::sign("not-the-secret", &body)))
    .set_payload(body)
    .to_request();
  let resp = test::call_service(&app, forged).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  let json: Value = test::read_body_json(resp).await;
  assert_eq!(json["error"], "Invalid webhook signature.");

  assert_eq!(payment_status(&state, order.id).await, PaymentStatus::Pending);
}

#[actix_web::test]
async fn unsigned_webhooks_are_accepted_without_a_secret() {
  let state = state();
  let order = online_order(&state).await;
  let app = test::init_service(App::new().app_data(web::Data::new(state.clone())).configure(configure_app_routes)).await;

  let req = test::TestRequest::post()
    .uri(WEBHOOK_URI)
    .set_payload(event_body("checkout.session.completed", &order))
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
  assert_eq!(payment_status(&state, order.id).await, PaymentStatus::Paid);
}

#[actix_web::test]
async fn unknown_events_are_acknowledged_and_ignored() {
  let state = state();
  let order = online_order(&state).await;
  let app = test::init_service(App::new().app_data(web::Data::new(state.clone())).configure(configure_app_routes)).await;

  let req = test::TestRequest::post()
    .uri(WEBHOOK_URI)
    .set_payload(r#"{"event_type":"customer.updated"}"#)
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
  assert_eq!(payment_status(&state, order.id).await, PaymentStatus::Pending);
}

#[actix_web::test]
async fn malformed_payload_and_unknown_order() {
  let state = state();
  let app = test::init_service(App::new().app_data(web::Data::new(state.clone())).configure(configure_app_routes)).await;

  let garbage = test::TestRequest::post().uri(WEBHOOK_URI).set_payload("{not json").to_request();
  assert_eq!(test::call_service(&app, garbage).await.status(), StatusCode::BAD_REQUEST);

  let missing = json!({
      "event_type": "checkout.session.completed",
      "metadata": { "order_id": Uuid::new_v4().to_string() },
  });
  let req = test::TestRequest::post()
    .uri(WEBHOOK_URI)
    .set_payload(missing.to_string())
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn cancel_racing_payment_completion_keeps_both_outcomes() {
  for _ in 0..25 {
    let state = state();
    let order = online_order(&state).await;
    let product_id = order.items[0].product_id;
    let owner = state.store.user_by_id(order.user_id).await.unwrap().unwrap();
    let body = web::Bytes::from(event_body("checkout.session.completed", &order));

    let canceller = {
      let state = state.clone();
      let claims = claims_for(&owner);
      let order_id = order.id;
      tokio::spawn(async move { order_lifecycle::cancel(state.store.as_ref(), &claims, order_id).await })
    };
    let settler = {
      let state = state.clone();
      tokio::spawn(async move {
        let ctx = Shared::new(PaymentWebhookCtxData::new(state.clone(), body, None));
        state.flows.run(ctx).await
      })
    };
    let (cancelled, settled) = tokio::join!(canceller, settler);
    assert!(cancelled.unwrap().is_ok());
    assert!(settled.unwrap().is_ok());

    let stored = state.store.order_by_id(order.id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Cancelled);
    assert_eq!(stored.payment_status, PaymentStatus::Paid);
    assert_eq!(stock_of(&state, product_id).await, 3);
  }
}
