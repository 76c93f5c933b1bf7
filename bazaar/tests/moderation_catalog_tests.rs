// tests/moderation_catalog_tests.rs
mod common;

use bazaar::errors::AppError;
use bazaar::models::{ModerationDecision, ProductDraft, ReviewInput, Role, ShopDetails, VerificationStatus};
use bazaar::pipelines::contexts::AddToCartCtxData;
use bazaar::services::{accounts, cart, catalog, moderation, reporting};
use common::*;
use conveyor::Shared;

fn draft(title: &str, stock: i32) -> ProductDraft {
  ProductDraft {
    title: title.into(),
    description: "Handmade".into(),
    price_cents: 1_500,
    stock,
    images: vec!["front.jpg".into()],
  }
}

fn shop() -> ShopDetails {
  ShopDetails {
    shop_name: "Potter's Wheel".into(),
    shop_address: "9 Clay Rd".into(),
    tax_id: "TX-99".into(),
  }
}

#[tokio::test]
async fn vendor_shop_verification_round_trip() {
  let state = state();
  let store = state.store.as_ref();
  let vendor = seed_user(&state, Role::Vendor, "potter@example.com").await;

  let submitted = moderation::submit_shop(store, vendor.id, shop()).await.unwrap();
  assert_eq!(submitted.shop_verification_status, Some(VerificationStatus::Pending));
  assert!(!submitted.is_shop_approved);

  let pending = moderation::list_vendors(store, Some(VerificationStatus::Pending)).await.unwrap();
  assert_eq!(pending.len(), 1);

  let rejected = moderation::decide_vendor(
    store,
    vendor.id,
    ModerationDecision::Reject {
      reason: "Tax id unreadable".into(),
    },
  )
  .await
  .unwrap();
  assert_eq!(rejected.shop_verification_status, Some(VerificationStatus::Rejected));
  assert_eq!(rejected.shop_rejection_reason.as_deref(), Some("Tax id unreadable"));
  assert!(!rejected.is_shop_approved);

  // Resubmission clears the reason and goes back to review.
  let resubmitted = moderation::submit_shop(store, vendor.id, shop()).await.unwrap();
  assert_eq!(resubmitted.shop_verification_status, Some(VerificationStatus::Pending));
  assert!(resubmitted.shop_rejection_reason.is_none());

  let approved = moderation::decide_vendor(store, vendor.id, ModerationDecision::Approve).await.unwrap();
  assert!(approved.is_shop_approved);
  assert!(approved.shop_approved_at.is_some());
  assert!(approved.shop_rejection_reason.is_none());
}

#[tokio::test]
async fn incomplete_shop_details_are_rejected() {
  let state = state();
  let vendor = seed_user(&state, Role::Vendor, "blank@example.com").await;
  let result = moderation::submit_shop(
    state.store.as_ref(),
    vendor.id,
    ShopDetails {
      tax_id: "  ".into(),
      ..shop()
    },
  )
  .await;
  assert!(matches!(result, Err(AppError::Validation(_))), "{result:?}");
}

#[tokio::test]
async fn deciding_on_a_non_vendor_is_not_found() {
  let state = state();
  let customer = seed_customer(&state).await;
  let result = moderation::decide_vendor(state.store.as_ref(), customer.id, ModerationDecision::Approve).await;
  assert!(matches!(result, Err(AppError::NotFound(_))), "{result:?}");
}

#[tokio::test]
async fn unapproved_vendors_cannot_list_products() {
  let state = state();
  let vendor = seed_user(&state, Role::Vendor, "new@example.com").await;
  let result = catalog::create_product(state.store.as_ref(), vendor.id, draft("Vase", 3)).await;
  assert!(matches!(result, Err(AppError::Forbidden(_))), "{result:?}");
}

#[tokio::test]
async fn products_become_public_only_after_approval() {
  let state = state();
  let store = state.store.as_ref();
  let vendor = seed_vendor(&state).await;

  let product = catalog::create_product(store, vendor.id, draft("Vase", 3)).await.unwrap();
  assert_eq!(product.verification_status, VerificationStatus::Pending);
  assert!(catalog::public_products(store, None, None).await.unwrap().is_empty());
  assert!(matches!(
    catalog::public_product(store, product.id).await,
    Err(AppError::NotFound(_))
  ));

  let approved = moderation::decide_product(store, product.id, ModerationDecision::Approve)
    .await
    .unwrap();
  assert!(approved.approved_at.is_some());
  assert_eq!(catalog::public_products(store, Some("vas".into()), None).await.unwrap().len(), 1);
  assert!(catalog::public_products(store, Some("bowl".into()), None).await.unwrap().is_empty());

  // Editing sends the listing back to review.
  let edited = catalog::update_product(store, vendor.id, product.id, draft("Tall vase", 3))
    .await
    .unwrap();
  assert_eq!(edited.verification_status, VerificationStatus::Pending);
  assert!(catalog::public_products(store, None, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn only_the_owner_manages_a_listing() {
  let state = state();
  let store = state.store.as_ref();
  let owner = seed_vendor(&state).await;
  let intruder = seed_vendor(&state).await;
  let product = seed_product(&state, owner.id, "Bowl", 900, 4).await;

  assert!(matches!(
    catalog::set_active(store, intruder.id, product.id, false).await,
    Err(AppError::Forbidden(_))
  ));
  assert!(matches!(
    catalog::delete_product(store, intruder.id, product.id).await,
    Err(AppError::Forbidden(_))
  ));

  let hidden = catalog::set_active(store, owner.id, product.id, false).await.unwrap();
  assert!(!hidden.is_active);
  assert!(catalog::public_products(store, None, None).await.unwrap().is_empty());

  catalog::delete_product(store, owner.id, product.id).await.unwrap();
  assert!(matches!(
    catalog::delete_product(store, owner.id, product.id).await,
    Err(AppError::NotFound(_))
  ));
}

#[tokio::test]
async fn one_review_per_customer() {
  let state = state();
  let store = state.store.as_ref();
  let vendor = seed_vendor(&state).await;
  let customer = seed_customer(&state).await;
  let product = seed_product(&state, vendor.id, "Mug", 700, 4).await;
  let review = || ReviewInput {
    rating: 5,
    comment: Some("Lovely glaze".into()),
    image: None,
  };

  let posted = catalog::add_review(store, &claims_for(&customer), product.id, review()).await.unwrap();
  assert_eq!(posted.rating, 5);
  assert!(matches!(
    catalog::add_review(store, &claims_for(&customer), product.id, review()).await,
    Err(AppError::Conflict(_))
  ));
  let stored = catalog::public_product(store, product.id).await.unwrap();
  assert_eq!(stored.reviews.len(), 1);
}

#[tokio::test]
async fn add_to_cart_merges_lines_and_respects_stock() {
  let state = state();
  let vendor = seed_vendor(&state).await;
  let customer = seed_customer(&state).await;
  let product = seed_product(&state, vendor.id, "Plate", 400, 5).await;

  let add = |quantity: i32| {
    let state = state.clone();
    let (user_id, product_id) = (customer.id, product.id);
    async move {
      let ctx = Shared::new(AddToCartCtxData::new(state.clone(), user_id, product_id, quantity));
      let result = state.flows.run(ctx.clone()).await;
      let line = ctx.read().updated_line;
      (result, line)
    }
  };

  let (result, line) = add(2).await;
  assert!(result.is_ok());
  assert_eq!(line.map(|l| l.quantity), Some(2));

  let (result, line) = add(3).await;
  assert!(result.is_ok());
  assert_eq!(line.map(|l| l.quantity), Some(5));

  let (result, _) = add(1).await;
  match result {
    Err(AppError::Validation(msg)) => assert!(msg.contains("Plate"), "{msg}"),
    other => panic!("unexpected: {other:?}"),
  }

  // Would overflow the stored quantity.
  let (result, _) = add(i32::MAX).await;
  match result {
    Err(AppError::Validation(msg)) => assert!(msg.contains("Plate"), "{msg}"),
    other => panic!("unexpected: {other:?}"),
  }

  let (result, _) = add(0).await;
  assert!(matches!(result, Err(AppError::Validation(_))));

  let view = cart::view(state.store.as_ref(), customer.id).await.unwrap();
  assert_eq!(view.items.len(), 1);
  assert_eq!(view.subtotal_cents, 2_000);
}

#[tokio::test]
async fn cart_quantity_updates_and_removal() {
  let state = state();
  let store = state.store.as_ref();
  let vendor = seed_vendor(&state).await;
  let customer = seed_customer(&state).await;
  let cup = seed_product(&state, vendor.id, "Cup", 300, 10).await;
  let saucer = seed_product(&state, vendor.id, "Saucer", 200, 10).await;
  fill_cart(&state, customer.id, &[(cup.id, 1), (saucer.id, 1)]).await;

  let view = cart::set_quantity(store, customer.id, cup.id, 4).await.unwrap();
  assert_eq!(view.subtotal_cents, 4 * 300 + 200);

  assert!(matches!(
    cart::set_quantity(store, customer.id, cup.id, 11).await,
    Err(AppError::Validation(_))
  ));

  let view = cart::set_quantity(store, customer.id, saucer.id, 0).await.unwrap();
  assert_eq!(view.items.len(), 1);

  let view = cart::remove_line(store, customer.id, cup.id).await.unwrap();
  assert!(view.items.is_empty());
  assert_eq!(view.subtotal_cents, 0);

  assert!(matches!(
    cart::remove_line(store, customer.id, cup.id).await,
    Err(AppError::NotFound(_))
  ));
}

#[tokio::test]
async fn delivery_agents_and_stats() {
  let state = state();
  let store = state.store.as_ref();
  let vendor = seed_vendor(&state).await;
  seed_product(&state, vendor.id, "Jug", 1_000, 2).await;

  let agent = accounts::create_delivery_agent(store, "Dee", "dee@example.com", PASSWORD).await.unwrap();
  assert_eq!(agent.role, Role::DeliveryGuy);
  assert!(matches!(
    accounts::create_delivery_agent(store, "Dee", "dee@example.com", PASSWORD).await,
    Err(AppError::Conflict(_))
  ));

  let stats = reporting::marketplace_stats(store).await.unwrap();
  assert_eq!(stats.users_by_role["deliveryGuy"], 1);
  assert_eq!(stats.users_by_role["vendor"], 1);
  assert_eq!(stats.users_by_role["admin"], 0);
  assert_eq!(stats.vendors_by_shop_status["approved"], 1);
  assert_eq!(stats.products_by_status["approved"], 1);
  assert_eq!(stats.orders_by_status["Processing"], 0);
  assert_eq!(stats.paid_revenue_cents, 0);
}

#[tokio::test]
async fn admin_is_seeded_once() {
  let state = state();
  let cfg = config(&[("ADMIN_EMAIL", "root@example.com"), ("ADMIN_PASSWORD", "super secret admin")]);

  let first = accounts::seed_admin(state.store.as_ref(), &cfg).await.unwrap();
  assert_eq!(first.map(|u| u.role), Some(Role::Admin));
  assert!(accounts::seed_admin(state.store.as_ref(), &cfg).await.unwrap().is_none());
  assert!(accounts::seed_admin(state.store.as_ref(), &config(&[])).await.unwrap().is_none());
}
