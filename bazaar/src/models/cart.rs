// bazaar/src/models/cart.rs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One cart entry. The cart lives on the user document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
  pub product_id: Uuid,
  pub quantity: i32,
}
