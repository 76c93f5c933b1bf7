// bazaar/src/models/verification.rs

use crate::errors::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Admin review state shared by vendor shops and product listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
  Pending,
  Approved,
  Rejected,
}

impl VerificationStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      VerificationStatus::Pending => "pending",
      VerificationStatus::Approved => "approved",
      VerificationStatus::Rejected => "rejected",
    }
  }
}

impl fmt::Display for VerificationStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for VerificationStatus {
  type Err = AppError;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "pending" => Ok(VerificationStatus::Pending),
      "approved" => Ok(VerificationStatus::Approved),
      "rejected" => Ok(VerificationStatus::Rejected),
      other => Err(AppError::Validation(format!("Unknown verification status '{}'.", other))),
    }
  }
}

/// An admin's verdict on a shop or a product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModerationDecision {
  Approve,
  Reject { reason: String },
}

impl ModerationDecision {
  /// Builds a decision from the wire form `{status, reason}`. Rejections need a
  /// non-blank reason; `pending` is not a decision.
  pub fn from_request(status: VerificationStatus, reason: Option<&str>) -> Result<Self> {
    match status {
      VerificationStatus::Approved => Ok(ModerationDecision::Approve),
      VerificationStatus::Rejected => {
        let reason = reason.map(str::trim).unwrap_or_default();
        if reason.is_empty() {
          return Err(AppError::Validation("A rejection reason is required.".to_string()));
        }
        Ok(ModerationDecision::Reject {
          reason: reason.to_string(),
        })
      }
      VerificationStatus::Pending => Err(AppError::Validation(
        "Status must be either 'approved' or 'rejected'.".to_string(),
      )),
    }
  }

  pub fn status(&self) -> VerificationStatus {
    match self {
      ModerationDecision::Approve => VerificationStatus::Approved,
      ModerationDecision::Reject { .. } => VerificationStatus::Rejected,
    }
  }
}
