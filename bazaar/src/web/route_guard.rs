// bazaar/src/web/route_guard.rs

//! Role areas: `/admin`, `/vendor`, `/user` and `/delivery` (under `/api/v1`)
//! each belong to one role. Requests are turned away here, before any
//! handler runs.

use actix_web::body::{BoxBody, MessageBody};
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::middleware::Next;
use actix_web::{web, HttpResponse, ResponseError};
use serde_json::json;
use tracing::{debug, warn};

use crate::errors::AppError;
use crate::models::Role;
use crate::services::session::SessionClaims;
use crate::state::AppState;
use crate::web::extractors::bearer_token;

pub const API_PREFIX: &str = "/api/v1";

const PROTECTED_AREAS: [(&str, Role); 4] = [
  ("/admin", Role::Admin),
  ("/vendor", Role::Vendor),
  ("/user", Role::User),
  ("/delivery", Role::DeliveryGuy),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
  Allow,
  Unauthenticated,
  /// Carries the caller's own area so clients can redirect there.
  WrongRole { home: String },
}

/// Role owning `path`, if the path lies in a protected area.
pub fn required_role(path: &str) -> Option<Role> {
  let relative = path.strip_prefix(API_PREFIX).unwrap_or(path);
  PROTECTED_AREAS
    .iter()
    .find(|(prefix, _)| relative == *prefix || relative.starts_with(&format!("{}/", prefix)))
    .map(|(_, role)| *role)
}

pub fn evaluate(path: &str, claims: Option<&SessionClaims>) -> GuardDecision {
  let Some(required) = required_role(path) else {
    return GuardDecision::Allow;
  };
  match claims {
    None => GuardDecision::Unauthenticated,
    Some(claims) if claims.role == required => GuardDecision::Allow,
    Some(claims) => GuardDecision::WrongRole {
      home: format!("{}{}", API_PREFIX, claims.role.home_prefix()),
    },
  }
}

pub async fn enforce_role<B>(req: ServiceRequest, next: Next<B>) -> Result<ServiceResponse<BoxBody>, actix_web::Error>
where
  B: MessageBody + 'static,
{
  let claims = req
    .app_data::<web::Data<AppState>>()
    .zip(bearer_token(req.headers()))
    .and_then(|(state, token)| state.sessions.verify(token).ok());

  // The router matches on the percent-decoded path, so the guard must too.
  match evaluate(req.match_info().as_str(), claims.as_ref()) {
    GuardDecision::Allow => Ok(next.call(req).await?.map_into_boxed_body()),
    GuardDecision::Unauthenticated => {
      debug!(path = %req.path(), "Guard: no valid session for a protected area.");
      let response = AppError::Auth("Authentication required.".to_string()).error_response();
      Ok(req.into_response(response))
    }
    GuardDecision::WrongRole { home } => {
      warn!(path = %req.path(), %home, "Guard: role not allowed in this area.");
      let response = HttpResponse::Forbidden().json(json!({
        "error": "You do not have access to this area.",
        "home": home,
      }));
      Ok(req.into_response(response))
    }
  }
}
