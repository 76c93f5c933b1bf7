// bazaar/src/services/webhook_signature.rs

//! `X-Bazaar-Signature`: lowercase hex HMAC-SHA256 of the raw request body.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "X-Bazaar-Signature";

pub fn sign(secret: &str, body: &[u8]) -> String {
  // HMAC accepts keys of any length, so this cannot fail.
  let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
    Ok(mac) => mac,
    Err(_) => return String::new(),
  };
  mac.update(body);
  hex::encode(mac.finalize().into_bytes())
}

/// Constant-time comparison of `signature` against the body's MAC.
pub fn verify(secret: &str, body: &[u8], signature: &str) -> bool {
  let Ok(expected) = hex::decode(signature.trim()) else {
    return false;
  };
  let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
    return false;
  };
  mac.update(body);
  mac.verify_slice(&expected).is_ok()
}
