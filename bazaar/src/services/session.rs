// bazaar/src/services/session.rs

//! Signed bearer tokens: `base64url(claims-json).base64url(hmac-sha256)`.

use crate::errors::{AppError, Result};
use crate::models::{Role, User};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

const MAX_TOKEN_LEN: usize = 2048;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
  pub sub: Uuid,
  pub name: String,
  pub email: String,
  pub role: Role,
  /// Expiry, unix seconds.
  pub exp: i64,
}

#[derive(Clone)]
pub struct SessionSigner {
  secret: Arc<Vec<u8>>,
  ttl: Duration,
}

impl SessionSigner {
  pub fn new(secret: &str, ttl_hours: i64) -> Self {
    Self {
      secret: Arc::new(secret.as_bytes().to_vec()),
      ttl: Duration::hours(ttl_hours),
    }
  }

  pub fn issue(&self, user: &User) -> Result<String> {
    self.issue_at(user, Utc::now())
  }

  pub fn issue_at(&self, user: &User, now: DateTime<Utc>) -> Result<String> {
    let claims = SessionClaims {
      sub: user.id,
      name: user.name.clone(),
      email: user.email.clone(),
      role: user.role,
      exp: (now + self.ttl).timestamp(),
    };
    let payload = serde_json::to_vec(&claims).map_err(|e| AppError::Internal(e.to_string()))?;
    let payload_part = URL_SAFE_NO_PAD.encode(payload);
    let sig_part = URL_SAFE_NO_PAD.encode(self.mac(payload_part.as_bytes())?.finalize().into_bytes());
    Ok(format!("{}.{}", payload_part, sig_part))
  }

  pub fn verify(&self, token: &str) -> Result<SessionClaims> {
    self.verify_at(token, Utc::now())
  }

  pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims> {
    let invalid = || AppError::Auth("Invalid or expired session.".to_string());
    if token.len() > MAX_TOKEN_LEN {
      return Err(invalid());
    }
    let (payload_part, sig_part) = token.split_once('.').ok_or_else(invalid)?;

    let expected = URL_SAFE_NO_PAD.decode(sig_part).map_err(|_| invalid())?;
    self
      .mac(payload_part.as_bytes())?
      .verify_slice(&expected)
      .map_err(|_| invalid())?;

    let payload = URL_SAFE_NO_PAD.decode(payload_part).map_err(|_| invalid())?;
    let claims: SessionClaims = serde_json::from_slice(&payload).map_err(|_| invalid())?;
    if claims.exp <= now.timestamp() {
      return Err(invalid());
    }
    Ok(claims)
  }

  fn mac(&self, data: &[u8]) -> Result<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(&self.secret).map_err(|e| AppError::Internal(e.to_string()))?;
    mac.update(data);
    Ok(mac)
  }
}
