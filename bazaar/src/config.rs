// bazaar/src/config.rs

use crate::errors::{AppError, Result};
use std::collections::HashMap;
use std::env;

const MIN_SESSION_SECRET_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
  Pretty,
  Json,
}

#[derive(Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  /// No database URL means the in-memory store is used.
  pub database_url: Option<String>,
  pub app_base_url: String,

  pub session_secret: String,
  pub session_ttl_hours: i64,

  /// Base URL of the hosted checkout page; the session id is appended to it.
  pub payment_checkout_url: String,
  pub payment_webhook_secret: Option<String>,
  pub currency: String,

  pub mail_sender: String,

  pub admin_email: Option<String>,
  pub admin_password: Option<String>,

  pub log_format: LogFormat,
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenvy::dotenv().ok();
    Self::from_lookup(|key| env::var(key).ok())
  }

  /// Builds the configuration from explicit key/value pairs. Used by tests.
  pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Result<Self> {
    let map: HashMap<String, String> = pairs.into_iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    Self::from_lookup(|key| map.get(key).cloned())
  }

  fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    // Blank values count as unset.
    let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    let server_host = get("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
    let server_port = get("SERVER_PORT")
      .unwrap_or_else(|| "8080".to_string())
      .parse::<u16>()
      .map_err(|e| AppError::Config(format!("Invalid SERVER_PORT: {}", e)))?;
    let database_url = get("DATABASE_URL");
    let app_base_url = get("APP_BASE_URL").unwrap_or_else(|| format!("http://{}:{}", server_host, server_port));

    let session_secret =
      get("SESSION_SECRET").ok_or_else(|| AppError::Config("Missing environment variable 'SESSION_SECRET'".to_string()))?;
    if session_secret.len() < MIN_SESSION_SECRET_LEN {
      return Err(AppError::Config(format!(
        "SESSION_SECRET must be at least {} bytes long",
        MIN_SESSION_SECRET_LEN
      )));
    }
    let session_ttl_hours = get("SESSION_TTL_HOURS")
      .unwrap_or_else(|| "24".to_string())
      .parse::<i64>()
      .ok()
      .filter(|h| *h > 0)
      .ok_or_else(|| AppError::Config("SESSION_TTL_HOURS must be a positive integer".to_string()))?;

    let payment_checkout_url =
      get("PAYMENT_CHECKOUT_URL").unwrap_or_else(|| format!("{}/mock-checkout", app_base_url.trim_end_matches('/')));
    let payment_webhook_secret = get("PAYMENT_WEBHOOK_SECRET");
    let currency = get("CURRENCY").unwrap_or_else(|| "usd".to_string()).to_lowercase();
    let mail_sender = get("MAIL_SENDER").unwrap_or_else(|| "noreply@bazaar.local".to_string());

    let admin_email = get("ADMIN_EMAIL");
    let admin_password = get("ADMIN_PASSWORD");
    if admin_email.is_some() != admin_password.is_some() {
      return Err(AppError::Config(
        "ADMIN_EMAIL and ADMIN_PASSWORD must be set together".to_string(),
      ));
    }

    let log_format = match get("LOG_FORMAT").as_deref() {
      None | Some("pretty") => LogFormat::Pretty,
      Some("json") => LogFormat::Json,
      Some(other) => return Err(AppError::Config(format!("Invalid LOG_FORMAT '{}'", other))),
    };

    Ok(Self {
      server_host,
      server_port,
      database_url,
      app_base_url,
      session_secret,
      session_ttl_hours,
      payment_checkout_url,
      payment_webhook_secret,
      currency,
      mail_sender,
      admin_email,
      admin_password,
      log_format,
    })
  }
}

// Secrets stay out of logs.
impl std::fmt::Debug for AppConfig {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("AppConfig")
      .field("server_host", &self.server_host)
      .field("server_port", &self.server_port)
      .field("database", &self.database_url.as_ref().map(|_| "[REDACTED]"))
      .field("app_base_url", &self.app_base_url)
      .field("session_ttl_hours", &self.session_ttl_hours)
      .field("payment_checkout_url", &self.payment_checkout_url)
      .field("webhook_signing", &self.payment_webhook_secret.is_some())
      .field("currency", &self.currency)
      .field("mail_sender", &self.mail_sender)
      .field("admin_seed", &self.admin_email)
      .field("log_format", &self.log_format)
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const SECRET: &str = "0123456789abcdef0123456789abcdef";

  #[test]
  fn defaults_apply() {
    let cfg = AppConfig::from_pairs([("SESSION_SECRET", SECRET)]).unwrap();
    assert_eq!(cfg.server_port, 8080);
    assert_eq!(cfg.session_ttl_hours, 24);
    assert_eq!(cfg.currency, "usd");
    assert!(cfg.database_url.is_none());
    assert!(cfg.payment_webhook_secret.is_none());
    assert_eq!(cfg.payment_checkout_url, "http://127.0.0.1:8080/mock-checkout");
    assert_eq!(cfg.log_format, LogFormat::Pretty);
  }

  #[test]
  fn short_session_secret_is_rejected() {
    let err = AppConfig::from_pairs([("SESSION_SECRET", "short")]).unwrap_err();
    assert!(matches!(err, AppError::Config(_)));
    assert!(AppConfig::from_pairs([]).is_err());
  }

  #[test]
  fn invalid_values_are_config_errors() {
    assert!(AppConfig::from_pairs([("SESSION_SECRET", SECRET), ("SERVER_PORT", "eighty")]).is_err());
    assert!(AppConfig::from_pairs([("SESSION_SECRET", SECRET), ("SESSION_TTL_HOURS", "0")]).is_err());
    assert!(AppConfig::from_pairs([("SESSION_SECRET", SECRET), ("LOG_FORMAT", "xml")]).is_err());
    assert!(AppConfig::from_pairs([("SESSION_SECRET", SECRET), ("ADMIN_EMAIL", "root@bazaar.test")]).is_err());
  }
}
