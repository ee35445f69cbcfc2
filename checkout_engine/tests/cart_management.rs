mod support;

use chrono::{Duration, Utc};

use checkout_engine::{
    db_types::{DiscountKind, NewCoupon, Owner, ShippingMethod},
    helpers::PricingConfig,
    traits::{CartError, CartManagement},
    CartApi,
};
use shop_common::Money;

fn coupon(code: &str, kind: DiscountKind, value: i64) -> NewCoupon {
    NewCoupon { code: code.to_string(), kind, value }
}

#[tokio::test]
async fn quantities_merge_and_totals_follow() {
    let db = support::new_db().await;
    let pid = support::seed_product(&db, "Widget", 10_000, 10).await;
    let owner = Owner::user("alice");
    let api = CartApi::new(db, PricingConfig::default());

    let cart = api.add_item(&owner, pid, 2).await.unwrap();
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].quantity, 2);

    let cart = api.add_item(&owner, pid, 3).await.unwrap();
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].quantity, 5);
    assert_eq!(cart.subtotal, Money::from(50_000));
    assert_eq!(cart.tax, Money::from(5_000));
    assert_eq!(cart.total, Money::from(55_000));

    let cart = api.update_item_quantity(&owner, pid, 1).await.unwrap();
    assert_eq!(cart.items[0].quantity, 1);
    assert_eq!(cart.total, Money::from(11_000));

    let cart = api.remove_item(&owner, pid).await.unwrap();
    assert!(cart.is_empty());
    assert_eq!(cart.total, Money::from(0));
}

#[tokio::test]
async fn stock_limits_are_enforced_at_add_time() {
    let db = support::new_db().await;
    let pid = support::seed_product(&db, "Scarce", 3, 3).await;
    let owner = Owner::user("alice");
    let api = CartApi::new(db, PricingConfig::default());

    let err = api.add_item(&owner, pid, 5).await.unwrap_err();
    assert!(matches!(err, CartError::InsufficientStock { requested: 5, available: 3 }));

    // the merged quantity counts against stock, not just the increment
    api.add_item(&owner, pid, 2).await.unwrap();
    let err = api.add_item(&owner, pid, 2).await.unwrap_err();
    assert!(matches!(err, CartError::InsufficientStock { requested: 4, available: 3 }));
}

#[tokio::test]
async fn invalid_targets_are_rejected() {
    let db = support::new_db().await;
    let pid = support::seed_product(&db, "Widget", 10_000, 5).await;
    let owner = Owner::user("alice");
    let api = CartApi::new(db, PricingConfig::default());

    assert!(matches!(api.add_item(&owner, pid, 0).await.unwrap_err(), CartError::InvalidQuantity));
    assert!(matches!(api.add_item(&owner, 999, 1).await.unwrap_err(), CartError::ProductNotFound(999)));
    assert!(matches!(api.remove_item(&owner, pid).await.unwrap_err(), CartError::CartNotFound));

    api.add_item(&owner, pid, 1).await.unwrap();
    assert!(matches!(api.remove_item(&owner, 999).await.unwrap_err(), CartError::ItemNotInCart(999)));
}

#[tokio::test]
async fn coupons_are_idempotent_per_code() {
    let db = support::new_db().await;
    let pid = support::seed_product(&db, "Widget", 20_000, 10).await;
    let owner = Owner::user("alice");
    let api = CartApi::new(db, PricingConfig::default());
    api.add_item(&owner, pid, 2).await.unwrap();

    let cart = api.apply_coupon(&owner, coupon("TEN", DiscountKind::Percent, 10)).await.unwrap();
    assert_eq!(cart.coupons.len(), 1);
    assert_eq!(cart.discount, Money::from(4_000));
    assert_eq!(cart.tax, Money::from(3_600));
    assert_eq!(cart.total, Money::from(39_600));

    // reapplying the same code replaces the entry instead of stacking it
    let cart = api.apply_coupon(&owner, coupon("TEN", DiscountKind::Percent, 10)).await.unwrap();
    assert_eq!(cart.coupons.len(), 1);
    assert_eq!(cart.total, Money::from(39_600));

    let cart = api.remove_coupon(&owner, "TEN").await.unwrap();
    assert!(cart.coupons.is_empty());
    assert_eq!(cart.total, Money::from(44_000));
}

#[tokio::test]
async fn coupons_need_a_non_empty_cart() {
    let db = support::new_db().await;
    let pid = support::seed_product(&db, "Widget", 10_000, 5).await;
    let owner = Owner::user("alice");
    let api = CartApi::new(db, PricingConfig::default());

    let err = api.apply_coupon(&owner, coupon("TEN", DiscountKind::Percent, 10)).await.unwrap_err();
    assert!(matches!(err, CartError::CartNotFound));

    api.add_item(&owner, pid, 1).await.unwrap();
    api.remove_item(&owner, pid).await.unwrap();
    let err = api.apply_coupon(&owner, coupon("TEN", DiscountKind::Percent, 10)).await.unwrap_err();
    assert!(matches!(err, CartError::EmptyCart));
}

#[tokio::test]
async fn shipping_method_reprices_the_cart() {
    let db = support::new_db().await;
    let pid = support::seed_product(&db, "Widget", 10_000, 5).await;
    let owner = Owner::user("alice");
    let api = CartApi::new(db, PricingConfig::default());
    api.add_item(&owner, pid, 1).await.unwrap();

    let cart = api.set_shipping(&owner, ShippingMethod::Express).await.unwrap();
    assert_eq!(cart.shipping_method, ShippingMethod::Express);
    assert_eq!(cart.shipping_cost, Money::from(1_500));
    assert_eq!(cart.total, Money::from(10_000 + 1_000 + 1_500));

    let cart = api.set_shipping(&owner, ShippingMethod::Pickup).await.unwrap();
    assert_eq!(cart.shipping_cost, Money::from(0));
    assert_eq!(cart.total, Money::from(11_000));
}

#[tokio::test]
async fn clearing_empties_lines_and_coupons() {
    let db = support::new_db().await;
    let p1 = support::seed_product(&db, "Widget", 10_000, 5).await;
    let p2 = support::seed_product(&db, "Gadget", 5_000, 5).await;
    let owner = Owner::user("alice");
    let api = CartApi::new(db, PricingConfig::default());
    api.add_item(&owner, p1, 1).await.unwrap();
    api.add_item(&owner, p2, 2).await.unwrap();
    api.apply_coupon(&owner, coupon("TEN", DiscountKind::Percent, 10)).await.unwrap();

    let cart = api.clear(&owner).await.unwrap();
    assert!(cart.is_empty());
    assert!(cart.coupons.is_empty());
    assert_eq!(cart.total, Money::from(0));
}

#[tokio::test]
async fn lapsed_carts_are_reclaimed() {
    let db = support::new_db().await;
    let pid = support::seed_product(&db, "Widget", 10_000, 5).await;
    let owner = Owner::user("alice");
    let api = CartApi::new(db.clone(), PricingConfig::default());
    api.add_item(&owner, pid, 1).await.unwrap();

    // nothing has lapsed yet
    assert_eq!(db.expire_stale_carts(Utc::now()).await.unwrap(), 0);

    // pretend a month went by
    let expired = db.expire_stale_carts(Utc::now() + Duration::days(31)).await.unwrap();
    assert_eq!(expired, 1);
    assert!(api.cart(&owner).await.unwrap().is_none());

    // the next add starts a fresh cart
    let cart = api.add_item(&owner, pid, 1).await.unwrap();
    assert_eq!(cart.items.len(), 1);
}
