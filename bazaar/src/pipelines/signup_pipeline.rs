// bazaar/src/pipelines/signup_pipeline.rs

use crate::errors::{AppError, Result as AppResult};
use crate::models::User;
use crate::pipelines::contexts::SignupCtxData;
use crate::services::auth_service;
use conveyor::{Flow, Registry, Shared, StepSpec, Workflow};
use tracing::{event, info, warn, Level};

pub fn register_signup_pipeline(registry: &Registry<AppError>) {
  let mut signup = Workflow::<SignupCtxData, AppError>::new(
    "signup",
    [
      StepSpec::required("validate_signup_input"),
      StepSpec::required("check_existing_account"),
      StepSpec::required("create_account"),
      StepSpec::optional("send_welcome_email"),
    ],
  );

  signup.on("validate_signup_input", validate_signup_input);
  signup.on("check_existing_account", check_existing_account);
  signup.on("create_account", create_account);
  signup.on("send_welcome_email", send_welcome_email);

  registry.register(signup);
  info!("Sign-up workflow registered.");
}

async fn validate_signup_input(ctx: Shared<SignupCtxData>) -> AppResult<Flow> {
  let guard = ctx.read();
  auth_service::ensure_self_service_role(guard.role)?;
  auth_service::validate_account_fields(&guard.name, &guard.email, &guard.password)?;
  event!(Level::DEBUG, role = %guard.role, "Sign-up input accepted.");
  Ok(Flow::Continue)
}

async fn check_existing_account(ctx: Shared<SignupCtxData>) -> AppResult<Flow> {
  let (email, store) = {
    let guard = ctx.read();
    (guard.email.clone(), guard.app_state.store.clone())
  };
  let existing = store.user_by_email(&email).await?;
  if existing.is_some() {
    warn!("Sign-up attempted with a registered email.");
    return Err(AppError::Conflict("An account with this email already exists.".to_string()));
  }
  Ok(Flow::Continue)
}

async fn create_account(ctx: Shared<SignupCtxData>) -> AppResult<Flow> {
  let (user, store) = {
    let guard = ctx.read();
    let hash = auth_service::hash_password(&guard.password)?;
    (User::new(&guard.name, &guard.email, hash, guard.role), guard.app_state.store.clone())
  };

  // The unique email constraint still guards a race with a concurrent sign-up.
  store.insert_user(&user).await?;
  info!(user_id = %user.id, role = %user.role, "Account created.");
  ctx.write().created_user = Some(user);
  Ok(Flow::Continue)
}

async fn send_welcome_email(ctx: Shared<SignupCtxData>) -> AppResult<Flow> {
  let (mailer, recipient) = {
    let guard = ctx.read();
    let recipient = guard.created_user.as_ref().map(|u| (u.email.clone(), u.name.clone()));
    (guard.app_state.mailer.clone(), recipient)
  };
  let Some((email, name)) = recipient else {
    return Ok(Flow::Continue);
  };

  mailer.send_welcome(&email, &name).await?;
  ctx.write().welcome_email_sent = true;
  Ok(Flow::Continue)
}
