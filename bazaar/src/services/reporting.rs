// bazaar/src/services/reporting.rs

//! Counts behind the admin dashboard charts.

use crate::errors::Result;
use crate::models::{OrderStatus, PaymentStatus, Role, VerificationStatus};
use crate::store::{OrderFilter, ProductFilter, Store, UserFilter};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketplaceStats {
  pub users_by_role: BTreeMap<String, usize>,
  pub vendors_by_shop_status: BTreeMap<String, usize>,
  pub products_by_status: BTreeMap<String, usize>,
  pub orders_by_status: BTreeMap<String, usize>,
  /// Sum of totals over orders whose payment is `Paid`.
  pub paid_revenue_cents: i64,
}

fn zeroed<'a>(keys: impl IntoIterator<Item = &'a str>) -> BTreeMap<String, usize> {
  keys.into_iter().map(|k| (k.to_string(), 0)).collect()
}

const VERIFICATION_KEYS: [VerificationStatus; 3] = [
  VerificationStatus::Pending,
  VerificationStatus::Approved,
  VerificationStatus::Rejected,
];

pub async fn marketplace_stats(store: &dyn Store) -> Result<MarketplaceStats> {
  let users = store.list_users(&UserFilter::default()).await?;
  let products = store.list_products(&ProductFilter::default()).await?;
  let orders = store.list_orders(&OrderFilter::default()).await?;

  let mut users_by_role = zeroed([Role::User, Role::Vendor, Role::Admin, Role::DeliveryGuy].iter().map(|r| r.as_str()));
  let mut vendors_by_shop_status = zeroed(VERIFICATION_KEYS.iter().map(|s| s.as_str()));
  for user in &users {
    *users_by_role.entry(user.role.as_str().to_string()).or_default() += 1;
    if let (Role::Vendor, Some(status)) = (user.role, user.shop_verification_status) {
      *vendors_by_shop_status.entry(status.as_str().to_string()).or_default() += 1;
    }
  }

  let mut products_by_status = zeroed(VERIFICATION_KEYS.iter().map(|s| s.as_str()));
  for product in &products {
    *products_by_status
      .entry(product.verification_status.as_str().to_string())
      .or_default() += 1;
  }

  let mut orders_by_status = zeroed(OrderStatus::ALL.iter().map(|s| s.as_str()));
  let mut paid_revenue_cents = 0;
  for order in &orders {
    *orders_by_status.entry(order.status.as_str().to_string()).or_default() += 1;
    if order.payment_status == PaymentStatus::Paid {
      paid_revenue_cents += order.total_amount_cents;
    }
  }

  Ok(MarketplaceStats {
    users_by_role,
    vendors_by_shop_status,
    products_by_status,
    orders_by_status,
    paid_revenue_cents,
  })
}
