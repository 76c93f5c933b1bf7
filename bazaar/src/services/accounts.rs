// bazaar/src/services/accounts.rs

//! Accounts that do not come through self-service sign-up.

use crate::config::AppConfig;
use crate::errors::Result;
use crate::models::{Role, User};
use crate::services::auth_service;
use crate::store::Store;
use tracing::{info, instrument, warn};

/// Creates the configured admin if no account holds that email yet.
/// Returns the new admin, or `None` when nothing was created.
#[instrument(name = "accounts::seed_admin", skip_all, err(Display))]
pub async fn seed_admin(store: &dyn Store, config: &AppConfig) -> Result<Option<User>> {
  let (Some(email), Some(password)) = (config.admin_email.as_deref(), config.admin_password.as_deref()) else {
    return Ok(None);
  };

  if let Some(existing) = store.user_by_email(email).await? {
    if existing.role != Role::Admin {
      warn!(%email, role = %existing.role, "Seed admin email belongs to a non-admin account; not seeding.");
    }
    return Ok(None);
  }

  auth_service::validate_account_fields("Administrator", email, password)?;
  let admin = User::new("Administrator", email, auth_service::hash_password(password)?, Role::Admin);
  store.insert_user(&admin).await?;
  info!(admin_id = %admin.id, "Seed admin created.");
  Ok(Some(admin))
}

#[instrument(name = "accounts::create_delivery_agent", skip(store, password), err(Display))]
pub async fn create_delivery_agent(store: &dyn Store, name: &str, email: &str, password: &str) -> Result<User> {
  auth_service::validate_account_fields(name, email, password)?;
  let agent = User::new(name, email, auth_service::hash_password(password)?, Role::DeliveryGuy);
  store.insert_user(&agent).await?;
  info!(agent_id = %agent.id, "Delivery agent created.");
  Ok(agent)
}
