// bazaar/src/web/extractors.rs

use actix_web::http::header::{HeaderMap, AUTHORIZATION};
use actix_web::{web, FromRequest, HttpRequest};
use futures_util::future::{ready, Ready};
use tracing::warn;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::Role;
use crate::services::session::SessionClaims;
use crate::state::AppState;

/// `Authorization: Bearer <token>`, if present.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
  headers
    .get(AUTHORIZATION)
    .and_then(|value| value.to_str().ok())
    .and_then(|value| value.strip_prefix("Bearer "))
    .map(str::trim)
    .filter(|token| !token.is_empty())
}

/// Caller identity decoded from a valid session token.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
  pub claims: SessionClaims,
}

impl AuthenticatedUser {
  pub fn id(&self) -> Uuid {
    self.claims.sub
  }

  pub fn role(&self) -> Role {
    self.claims.role
  }

  /// Handlers re-check the role even behind the route guard.
  pub fn require(&self, role: Role) -> Result<(), AppError> {
    if self.claims.role != role {
      return Err(AppError::Forbidden(format!(
        "This action requires the '{}' role.",
        role
      )));
    }
    Ok(())
  }
}

impl FromRequest for AuthenticatedUser {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
    let Some(state) = req.app_data::<web::Data<AppState>>() else {
      return ready(Err(AppError::Internal("Application state is not configured.".to_string())));
    };
    let Some(token) = bearer_token(req.headers()) else {
      return ready(Err(AppError::Auth("Authentication required.".to_string())));
    };
    ready(state.sessions.verify(token).map(|claims| AuthenticatedUser { claims }).map_err(|e| {
      warn!(path = %req.path(), "Rejected session token.");
      e
    }))
  }
}
