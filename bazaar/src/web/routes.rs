// bazaar/src/web/routes.rs

use actix_web::{error, middleware, web, HttpResponse};
use serde_json::json;

use crate::errors::AppError;
use crate::web::handlers::{
  admin_handlers, auth_handlers, cart_handlers, checkout_handlers, delivery_handlers, order_handlers, product_handlers,
  vendor_handlers, webhook_handlers,
};
use crate::web::route_guard::{enforce_role, API_PREFIX};

async fn health_check_handler() -> HttpResponse {
  HttpResponse::Ok().json(json!({ "status": "ok" }))
}

// Extractor failures surface as 400 with the usual `{"error": ...}` body.
fn extractor_configs(cfg: &mut web::ServiceConfig) {
  cfg
    .app_data(web::JsonConfig::default().error_handler(|err, _req| {
      let message = match &err {
        error::JsonPayloadError::Deserialize(inner) => format!("Invalid request body: {}", inner),
        other => format!("Invalid request body: {}", other),
      };
      error::Error::from(AppError::Validation(message))
    }))
    .app_data(
      web::QueryConfig::default()
        .error_handler(|err, _req| error::Error::from(AppError::Validation(format!("Invalid query string: {}", err)))),
    )
    .app_data(
      web::PathConfig::default()
        .error_handler(|err, _req| error::Error::from(AppError::Validation(format!("Invalid path parameter: {}", err)))),
    );
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  extractor_configs(cfg);

  cfg.service(
    web::scope(API_PREFIX)
      .wrap(middleware::from_fn(enforce_role))
      .route("/health", web::get().to(health_check_handler))
      .service(
        web::scope("/auth")
          .route("/signup", web::post().to(auth_handlers::signup_handler))
          .route("/signin", web::post().to(auth_handlers::signin_handler))
          .route("/me", web::get().to(auth_handlers::me_handler)),
      )
      .service(
        web::scope("/products")
          .route("", web::get().to(product_handlers::list_products_handler))
          .route("/{product_id}", web::get().to(product_handlers::get_product_handler))
          .route("/{product_id}/reviews", web::post().to(product_handlers::add_review_handler)),
      )
      .service(
        web::scope("/user")
          .service(
            web::resource("/cart")
              .route(web::get().to(cart_handlers::view_cart_handler))
              .route(web::post().to(cart_handlers::add_to_cart_handler))
              .route(web::delete().to(cart_handlers::clear_cart_handler)),
          )
          .service(
            web::resource("/cart/{product_id}")
              .route(web::patch().to(cart_handlers::set_cart_quantity_handler))
              .route(web::delete().to(cart_handlers::remove_cart_line_handler)),
          )
          .route("/checkout", web::post().to(checkout_handlers::checkout_handler))
          .route("/orders", web::get().to(order_handlers::list_my_orders_handler))
          .route("/orders/{order_id}", web::get().to(order_handlers::get_my_order_handler))
          .route("/orders/{order_id}/cancel", web::post().to(order_handlers::cancel_my_order_handler)),
      )
      .service(
        web::scope("/vendor")
          .route("/shop", web::put().to(vendor_handlers::submit_shop_handler))
          .service(
            web::resource("/products")
              .route(web::get().to(vendor_handlers::list_vendor_products_handler))
              .route(web::post().to(vendor_handlers::create_product_handler)),
          )
          .service(
            web::resource("/products/{product_id}")
              .route(web::put().to(vendor_handlers::update_product_handler))
              .route(web::delete().to(vendor_handlers::delete_product_handler)),
          )
          .route("/products/{product_id}/active", web::patch().to(vendor_handlers::set_product_active_handler))
          .route("/orders", web::get().to(vendor_handlers::list_vendor_orders_handler))
          .route("/orders/{order_id}/confirm", web::post().to(vendor_handlers::confirm_order_handler))
          .route("/orders/{order_id}/ship", web::post().to(vendor_handlers::ship_order_handler)),
      )
      .service(
        web::scope("/delivery")
          .route("/orders", web::get().to(delivery_handlers::delivery_queue_handler))
          .route("/orders/{order_id}/deliver", web::post().to(delivery_handlers::deliver_order_handler)),
      )
      .service(
        web::scope("/admin")
          .route("/vendors", web::get().to(admin_handlers::list_vendors_handler))
          .route("/vendors/{vendor_id}/status", web::patch().to(admin_handlers::decide_vendor_handler))
          .route("/products", web::get().to(admin_handlers::list_products_handler))
          .route("/products/{product_id}/status", web::patch().to(admin_handlers::decide_product_handler))
          .route("/orders", web::get().to(admin_handlers::list_orders_handler))
          .route("/orders/{order_id}/cancel", web::post().to(admin_handlers::cancel_order_handler))
          .route("/delivery-agents", web::post().to(admin_handlers::create_delivery_agent_handler))
          .route("/stats", web::get().to(admin_handlers::stats_handler)),
      )
      .service(web::scope("/webhooks").route("/payments", web::post().to(webhook_handlers::payment_webhook_handler))),
  );
}
