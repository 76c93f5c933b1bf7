// bazaar/src/models/product.rs

use crate::errors::{AppError, Result};
use crate::models::verification::{ModerationDecision, VerificationStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const MAX_PRODUCT_IMAGES: usize = 4;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
  pub user_id: Uuid,
  pub user_name: String,
  pub rating: i16,
  pub comment: Option<String>,
  pub image: Option<String>,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewInput {
  pub rating: i16,
  pub comment: Option<String>,
  pub image: Option<String>,
}

/// Vendor-editable fields of a listing.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDraft {
  pub title: String,
  #[serde(default)]
  pub description: String,
  pub price_cents: i64,
  pub stock: i32,
  #[serde(default)]
  pub images: Vec<String>,
}

impl ProductDraft {
  pub fn validated(self) -> Result<Self> {
    let title = self.title.trim().to_string();
    if title.is_empty() {
      return Err(AppError::Validation("Product title is required.".to_string()));
    }
    if self.price_cents <= 0 {
      return Err(AppError::Validation("Price must be greater than zero.".to_string()));
    }
    if self.stock < 0 {
      return Err(AppError::Validation("Stock cannot be negative.".to_string()));
    }
    if self.images.len() > MAX_PRODUCT_IMAGES {
      return Err(AppError::Validation(format!(
        "A product can have at most {} images.",
        MAX_PRODUCT_IMAGES
      )));
    }
    Ok(Self {
      title,
      description: self.description.trim().to_string(),
      ..self
    })
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
  pub id: Uuid,
  pub vendor_id: Uuid,
  pub title: String,
  pub description: String,
  pub price_cents: i64,
  pub stock: i32,
  pub is_stock_available: bool,
  pub images: Vec<String>,
  pub verification_status: VerificationStatus,
  pub rejection_reason: Option<String>,
  pub approved_at: Option<DateTime<Utc>>,
  pub is_active: bool,
  pub reviews: Vec<Review>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Product {
  /// New listings start `pending` and active. `draft` must already be validated.
  pub fn new(vendor_id: Uuid, draft: ProductDraft) -> Self {
    let now = Utc::now();
    Self {
      id: Uuid::new_v4(),
      vendor_id,
      title: draft.title,
      description: draft.description,
      price_cents: draft.price_cents,
      stock: draft.stock,
      is_stock_available: draft.stock > 0,
      images: draft.images,
      verification_status: VerificationStatus::Pending,
      rejection_reason: None,
      approved_at: None,
      is_active: true,
      reviews: Vec::new(),
      created_at: now,
      updated_at: now,
    }
  }

  pub fn is_publicly_visible(&self) -> bool {
    self.verification_status == VerificationStatus::Approved && self.is_active
  }

  /// Every stock write goes through here so the availability flag never drifts.
  pub fn set_stock(&mut self, stock: i32) {
    self.stock = stock;
    self.is_stock_available = stock > 0;
    self.updated_at = Utc::now();
  }

  /// Vendor edit. Edited listings go back to review.
  pub fn apply_draft(&mut self, draft: ProductDraft) {
    self.title = draft.title;
    self.description = draft.description;
    self.price_cents = draft.price_cents;
    self.images = draft.images;
    self.set_stock(draft.stock);
    self.verification_status = VerificationStatus::Pending;
    self.rejection_reason = None;
    self.approved_at = None;
  }

  pub fn apply_decision(&mut self, decision: &ModerationDecision, now: DateTime<Utc>) {
    match decision {
      ModerationDecision::Approve => {
        self.rejection_reason = None;
        self.approved_at = Some(now);
      }
      ModerationDecision::Reject { reason } => {
        self.rejection_reason = Some(reason.clone());
        self.approved_at = None;
      }
    }
    self.verification_status = decision.status();
    self.updated_at = now;
  }

  /// One review per user.
  pub fn add_review(&mut self, user_id: Uuid, user_name: &str, input: ReviewInput) -> Result<&Review> {
    if !(1..=5).contains(&input.rating) {
      return Err(AppError::Validation("Rating must be between 1 and 5.".to_string()));
    }
    if self.reviews.iter().any(|r| r.user_id == user_id) {
      return Err(AppError::Conflict("You have already reviewed this product.".to_string()));
    }
    let clean = |s: Option<String>| s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
    self.reviews.push(Review {
      user_id,
      user_name: user_name.to_string(),
      rating: input.rating,
      comment: clean(input.comment),
      image: clean(input.image),
      created_at: Utc::now(),
    });
    self.updated_at = Utc::now();
    Ok(&self.reviews[self.reviews.len() - 1])
  }

  pub fn average_rating(&self) -> Option<f64> {
    if self.reviews.is_empty() {
      return None;
    }
    let sum: i64 = self.reviews.iter().map(|r| i64::from(r.rating)).sum();
    Some(sum as f64 / self.reviews.len() as f64)
  }
}
