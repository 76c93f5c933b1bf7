// bazaar/src/services/auth_service.rs

//! Password hashing and sign-up field checks.

use crate::errors::AppError;
use crate::models::Role;
use argon2::{
  password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
  Argon2,
};
use once_cell::sync::Lazy;
use tracing::{debug, error, instrument};

pub const MIN_PASSWORD_LEN: usize = 8;

/// Hashes `password` with Argon2 default parameters and a fresh salt.
#[instrument(name = "auth_service::hash_password", skip(password), err(Display))]
pub fn hash_password(password: &str) -> Result<String, AppError> {
  if password.is_empty() {
    return Err(AppError::Validation("Password cannot be empty.".to_string()));
  }

  let salt = SaltString::generate(&mut OsRng);
  match Argon2::default().hash_password(password.as_bytes(), &salt) {
    Ok(hash) => {
      debug!("Password hashed.");
      Ok(hash.to_string())
    }
    Err(argon_err) => {
      error!(error = %argon_err, "Argon2 password hashing failed.");
      Err(AppError::Internal(format!("Password hashing failed: {}", argon_err)))
    }
  }
}

/// `Ok(false)` on a plain mismatch. A stored hash that cannot be parsed is a
/// server-side problem and surfaces as `Internal`.
#[instrument(name = "auth_service::verify_password", skip_all, err(Display))]
pub fn verify_password(stored_hash: &str, provided_password: &str) -> Result<bool, AppError> {
  if stored_hash.is_empty() || provided_password.is_empty() {
    return Ok(false);
  }

  let parsed_hash = PasswordHash::new(stored_hash).map_err(|parse_err| {
    error!(error = %parse_err, "Stored password hash could not be parsed.");
    AppError::Internal(format!("Invalid stored password hash: {}", parse_err))
  })?;

  match Argon2::default().verify_password(provided_password.as_bytes(), &parsed_hash) {
    Ok(()) => Ok(true),
    Err(argon2::password_hash::Error::Password) => Ok(false),
    Err(other) => {
      error!(error = %other, "Argon2 verification failed.");
      Err(AppError::Internal(format!("Password verification failed: {}", other)))
    }
  }
}

// Verified against when the account does not exist, so an unknown email costs
// the same Argon2 work as a wrong password.
static DECOY_HASH: Lazy<Option<String>> = Lazy::new(|| hash_password("decoy-password-never-matches").ok());

/// Runs a full verification that can never succeed.
pub fn burn_password_check(provided_password: &str) {
  if let Some(decoy) = DECOY_HASH.as_deref() {
    let _ = verify_password(decoy, provided_password);
  }
}

/// Self-service sign-up is open to customers and vendors only.
pub fn ensure_self_service_role(role: Role) -> Result<(), AppError> {
  match role {
    Role::User | Role::Vendor => Ok(()),
    other => Err(AppError::Validation(format!(
      "Accounts with role '{}' cannot be created through sign-up.",
      other
    ))),
  }
}

pub fn validate_account_fields(name: &str, email: &str, password: &str) -> Result<(), AppError> {
  if name.trim().is_empty() {
    return Err(AppError::Validation("Name is required.".to_string()));
  }
  let email = email.trim();
  if email.is_empty() || !email.contains('@') {
    return Err(AppError::Validation("A valid email is required.".to_string()));
  }
  if password.chars().count() < MIN_PASSWORD_LEN {
    return Err(AppError::Validation(format!(
      "Password must be at least {} characters long.",
      MIN_PASSWORD_LEN
    )));
  }
  Ok(())
}
