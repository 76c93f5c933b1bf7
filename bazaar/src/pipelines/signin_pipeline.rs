// bazaar/src/pipelines/signin_pipeline.rs

use crate::errors::{AppError, Result as AppResult};
use crate::pipelines::contexts::SigninCtxData;
use crate::services::auth_service;
use conveyor::{Flow, Registry, Shared, StepSpec, Workflow};
use tracing::{event, info, warn, Level};

const BAD_CREDENTIALS: &str = "Invalid email or password.";

pub fn register_signin_pipeline(registry: &Registry<AppError>) {
  let mut signin = Workflow::<SigninCtxData, AppError>::new(
    "signin",
    [
      StepSpec::required("validate_signin_input"),
      StepSpec::required("load_account"),
      StepSpec::required("verify_password"),
      StepSpec::required("issue_session"),
    ],
  );

  signin.on("validate_signin_input", |ctx: Shared<SigninCtxData>| async move {
    let (email_is_valid, password_is_empty) = {
      let guard = ctx.read();
      (guard.email.contains('@'), guard.password.is_empty())
    };
    if !email_is_valid {
      return Err(AppError::Validation("A valid email is required.".to_string()));
    }
    if password_is_empty {
      return Err(AppError::Validation("Password is required.".to_string()));
    }
    Ok(Flow::Continue)
  });

  signin.on("load_account", load_account);
  signin.on("verify_password", verify_password);
  signin.on("issue_session", issue_session);

  registry.register(signin);
  info!("Sign-in workflow registered.");
}

async fn load_account(ctx: Shared<SigninCtxData>) -> AppResult<Flow> {
  let (email, password, store) = {
    let guard = ctx.read();
    (guard.email.clone(), guard.password.clone(), guard.app_state.store.clone())
  };

  let found = store.user_by_email(&email).await?;
  let Some(user) = found else {
    // Same answer and the same hashing cost as a wrong password.
    auth_service::burn_password_check(&password);
    warn!("Sign-in for an unknown email.");
    return Err(AppError::Auth(BAD_CREDENTIALS.to_string()));
  };
  event!(Level::DEBUG, user_id = %user.id, "Account found for sign-in.");
  ctx.write().user = Some(user);
  Ok(Flow::Continue)
}

async fn verify_password(ctx: Shared<SigninCtxData>) -> AppResult<Flow> {
  let (stored_hash, password, user_id) = {
    let guard = ctx.read();
    let user = guard
      .user
      .as_ref()
      .ok_or_else(|| AppError::Internal("Account missing before password check.".to_string()))?;
    (user.password_hash.clone(), guard.password.clone(), user.id)
  };

  if !auth_service::verify_password(&stored_hash, &password)? {
    warn!(%user_id, "Password mismatch on sign-in.");
    return Err(AppError::Auth(BAD_CREDENTIALS.to_string()));
  }
  Ok(Flow::Continue)
}

async fn issue_session(ctx: Shared<SigninCtxData>) -> AppResult<Flow> {
  let token = {
    let guard = ctx.read();
    let user = guard
      .user
      .as_ref()
      .ok_or_else(|| AppError::Internal("Account missing before session issue.".to_string()))?;
    guard.app_state.sessions.issue(user)?
  };
  ctx.write().session_token = Some(token);
  info!("Session issued.");
  Ok(Flow::Continue)
}
