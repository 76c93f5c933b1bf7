// bazaar/src/web/handlers/auth_handlers.rs

use actix_web::{web, HttpResponse};
use conveyor::{Outcome, Shared};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::models::Role;
use crate::pipelines::contexts::{SigninCtxData, SignupCtxData};
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

fn default_role() -> Role {
  Role::User
}

#[derive(Deserialize, Debug)]
pub struct SignupRequestPayload {
  pub name: String,
  pub email: String,
  pub password: String,
  #[serde(default = "default_role")]
  pub role: Role,
}

#[derive(Deserialize, Debug)]
pub struct SigninRequestPayload {
  pub email: String,
  pub password: String,
}

#[instrument(
    name = "handler::signup",
    skip(app_state, req_payload),
    fields(role = %req_payload.role)
)]
pub async fn signup_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<SignupRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let ctx = Shared::new(SignupCtxData::new(
    app_state.get_ref().clone(),
    payload.name,
    payload.email,
    payload.password,
    payload.role,
  ));

  match app_state.flows.run(ctx.clone()).await {
    Ok(Outcome::Completed) => {
      let guard = ctx.read();
      let user = guard.created_user.as_ref().ok_or_else(|| {
        warn!("Sign-up completed without a created account.");
        AppError::Internal("Sign-up completed without creating an account.".to_string())
      })?;
      info!(user_id = %user.id, "Sign-up succeeded.");
      Ok(HttpResponse::Created().json(json!({
          "message": "Account created successfully.",
          "user": user,
          "welcomeEmailSent": guard.welcome_email_sent,
      })))
    }
    Ok(Outcome::Halted) => Err(AppError::Internal("Sign-up was halted by an internal step.".to_string())),
    Err(app_err) => {
      warn!(error = %app_err, "Sign-up failed.");
      Err(app_err)
    }
  }
}

#[instrument(name = "handler::signin", skip(app_state, req_payload))]
pub async fn signin_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<SigninRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let ctx = Shared::new(SigninCtxData::new(
    app_state.get_ref().clone(),
    payload.email.trim().to_lowercase(),
    payload.password,
  ));

  match app_state.flows.run(ctx.clone()).await {
    Ok(Outcome::Completed) => {
      let guard = ctx.read();
      let (Some(user), Some(token)) = (guard.user.as_ref(), guard.session_token.as_ref()) else {
        return Err(AppError::Internal("Sign-in completed without a session.".to_string()));
      };
      info!(user_id = %user.id, "Sign-in succeeded.");
      Ok(HttpResponse::Ok().json(json!({
          "token": token,
          "user": user,
          "home": format!("/api/v1{}", user.role.home_prefix()),
      })))
    }
    Ok(Outcome::Halted) => Err(AppError::Auth("Authentication was halted.".to_string())),
    Err(app_err) => {
      warn!(error = %app_err, "Sign-in failed.");
      Err(app_err)
    }
  }
}

#[instrument(name = "handler::me", skip(app_state, auth_user), fields(user_id = %auth_user.id()))]
pub async fn me_handler(app_state: web::Data<AppState>, auth_user: AuthenticatedUser) -> Result<HttpResponse, AppError> {
  let user = app_state
    .store
    .user_by_id(auth_user.id())
    .await?
    .ok_or_else(|| AppError::Auth("Session refers to a deleted account.".to_string()))?;
  Ok(HttpResponse::Ok().json(user))
}
