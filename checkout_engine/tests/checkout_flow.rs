mod support;

use checkout_engine::{
    db_types::{AuditStatus, OrderStatus, Owner, PaymentStatus},
    helpers::PricingConfig,
    traits::{CheckoutDatabase, CheckoutError, InventoryManagement},
    CartApi,
    CheckoutRequest,
};
use shop_common::Money;

fn request_with_address() -> CheckoutRequest {
    CheckoutRequest { billing_address: Some(support::address()), ..Default::default() }
}

#[tokio::test]
async fn checkout_then_verify_updates_all_state() {
    let db = support::new_db().await;
    let pid = support::seed_product(&db, "Widget", 10_000, 5).await;
    let owner = Owner::user("alice");
    let carts = CartApi::new(db.clone(), PricingConfig::default());
    let cart = carts.add_item(&owner, pid, 2).await.unwrap();
    assert_eq!(cart.subtotal, Money::from(20_000));
    assert_eq!(cart.tax, Money::from(2_000));
    assert_eq!(cart.total, Money::from(22_000));

    let api = support::checkout_api(&db);
    let result = api.checkout(&support::customer(owner.clone()), request_with_address()).await.unwrap();
    let order = result.order;
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.payment.status, PaymentStatus::Pending);
    assert_eq!(order.total, Money::from(22_000));
    assert_eq!(order.items.len(), 1);
    assert!(!result.client_token.is_empty());

    let gw = order.payment.gateway_order_id.clone();
    let audit = db.fetch_audit_by_gateway_order_id(&gw).await.unwrap().expect("audit entry must exist");
    assert_eq!(audit.status, AuditStatus::Initiated);
    assert_eq!(audit.amount, Money::from(22_000));
    // the cart stays active until the payment is verified
    assert!(carts.cart(&owner).await.unwrap().is_some());

    let verifier = support::verification_api(&db);
    let sig = support::sign(gw.as_str(), "pay-1");
    let (confirmed, newly) = verifier.verify_payment(&owner, order.id, &gw, "pay-1", &sig).await.unwrap();
    assert!(newly);
    assert_eq!(confirmed.status, OrderStatus::Confirmed);
    assert_eq!(confirmed.payment.status, PaymentStatus::Paid);
    assert!(confirmed.payment.paid_at.is_some());
    assert_eq!(confirmed.payment.gateway_payment_id.as_deref(), Some("pay-1"));

    let product = db.fetch_product_record(pid).await.unwrap().unwrap();
    assert_eq!(product.stock, 3);
    assert_eq!(product.sales, 2);
    assert!(carts.cart(&owner).await.unwrap().is_none());
    let audit = db.fetch_audit_by_gateway_order_id(&gw).await.unwrap().unwrap();
    assert_eq!(audit.status, AuditStatus::Success);
    assert!(audit.completed_at.is_some());
}

#[tokio::test]
async fn replayed_confirmation_applies_nothing() {
    let db = support::new_db().await;
    let pid = support::seed_product(&db, "Widget", 10_000, 5).await;
    let owner = Owner::user("alice");
    let carts = CartApi::new(db.clone(), PricingConfig::default());
    carts.add_item(&owner, pid, 2).await.unwrap();
    let api = support::checkout_api(&db);
    let result = api.checkout(&support::customer(owner.clone()), request_with_address()).await.unwrap();
    let gw = result.order.payment.gateway_order_id.clone();

    let verifier = support::verification_api(&db);
    let sig = support::sign(gw.as_str(), "pay-1");
    let (_, newly) = verifier.verify_payment(&owner, result.order.id, &gw, "pay-1", &sig).await.unwrap();
    assert!(newly);
    let (order, newly) = verifier.verify_payment(&owner, result.order.id, &gw, "pay-1", &sig).await.unwrap();
    assert!(!newly);
    assert_eq!(order.payment.status, PaymentStatus::Paid);

    // stock was decremented exactly once
    let product = db.fetch_product_record(pid).await.unwrap().unwrap();
    assert_eq!(product.stock, 3);
    assert_eq!(product.sales, 2);
}

#[tokio::test]
async fn forged_signature_is_rejected_and_audited() {
    let db = support::new_db().await;
    let pid = support::seed_product(&db, "Widget", 10_000, 5).await;
    let owner = Owner::user("alice");
    let carts = CartApi::new(db.clone(), PricingConfig::default());
    carts.add_item(&owner, pid, 1).await.unwrap();
    let api = support::checkout_api(&db);
    let result = api.checkout(&support::customer(owner.clone()), request_with_address()).await.unwrap();
    let gw = result.order.payment.gateway_order_id.clone();

    let verifier = support::verification_api(&db);
    let err = verifier.verify_payment(&owner, result.order.id, &gw, "pay-1", "deadbeef").await.unwrap_err();
    assert!(matches!(err, CheckoutError::SignatureMismatch));

    let audit = db.fetch_audit_by_gateway_order_id(&gw).await.unwrap().unwrap();
    assert_eq!(audit.status, AuditStatus::Failed);
    let order = db.fetch_order(result.order.id, &owner).await.unwrap().unwrap();
    assert_eq!(order.payment.status, PaymentStatus::Pending);
    let product = db.fetch_product_record(pid).await.unwrap().unwrap();
    assert_eq!(product.stock, 5);
}

#[tokio::test]
async fn late_forgery_cannot_downgrade_the_audit_ledger() {
    let db = support::new_db().await;
    let pid = support::seed_product(&db, "Widget", 10_000, 5).await;
    let owner = Owner::user("alice");
    let carts = CartApi::new(db.clone(), PricingConfig::default());
    carts.add_item(&owner, pid, 1).await.unwrap();
    let api = support::checkout_api(&db);
    let result = api.checkout(&support::customer(owner.clone()), request_with_address()).await.unwrap();
    let gw = result.order.payment.gateway_order_id.clone();

    let verifier = support::verification_api(&db);
    let sig = support::sign(gw.as_str(), "pay-1");
    let (_, newly) = verifier.verify_payment(&owner, result.order.id, &gw, "pay-1", &sig).await.unwrap();
    assert!(newly);

    // a forged callback arriving after the confirmation must not rewrite history
    let err = verifier.verify_payment(&owner, result.order.id, &gw, "pay-2", "deadbeef").await.unwrap_err();
    assert!(matches!(err, CheckoutError::SignatureMismatch));
    let audit = db.fetch_audit_by_gateway_order_id(&gw).await.unwrap().unwrap();
    assert_eq!(audit.status, AuditStatus::Success);
    assert_eq!(audit.gateway_payment_id.as_deref(), Some("pay-1"));
    let order = db.fetch_order(result.order.id, &owner).await.unwrap().unwrap();
    assert_eq!(order.payment.status, PaymentStatus::Paid);
}

#[tokio::test]
async fn checkout_requires_a_customer_email() {
    let db = support::new_db().await;
    let pid = support::seed_product(&db, "Widget", 10_000, 5).await;
    let owner = Owner::user("alice");
    let carts = CartApi::new(db.clone(), PricingConfig::default());
    carts.add_item(&owner, pid, 1).await.unwrap();
    let api = support::checkout_api(&db);

    let mut customer = support::customer(owner.clone());
    customer.email = String::new();
    let err = api.checkout(&customer, request_with_address()).await.unwrap_err();
    assert!(matches!(err, CheckoutError::MissingCustomerEmail));

    // a billing email satisfies the requirement even with a blank profile
    let mut address = support::address();
    address.email = Some("billing@example.com".to_string());
    let request = CheckoutRequest { billing_address: Some(address), ..Default::default() };
    let result = api.checkout(&customer, request).await.unwrap();
    assert_eq!(result.order.customer_email, "billing@example.com");
}

#[tokio::test]
async fn gateway_rejection_leaves_no_order_behind() {
    use checkout_engine::CheckoutApi;
    let db = support::new_db().await;
    let pid = support::seed_product(&db, "Widget", 10_000, 5).await;
    let owner = Owner::user("alice");
    let carts = CartApi::new(db.clone(), PricingConfig::default());
    carts.add_item(&owner, pid, 1).await.unwrap();

    let api =
        CheckoutApi::new(db.clone(), support::RefusingGateway, support::NoAddressBook, PricingConfig::default());
    let err = api.checkout(&support::customer(owner.clone()), request_with_address()).await.unwrap_err();
    assert!(matches!(err, CheckoutError::GatewayError(_)));

    // the cart is untouched and ready for another attempt
    let cart = carts.cart(&owner).await.unwrap().expect("cart must still be active");
    assert_eq!(cart.items.len(), 1);
    let product = db.fetch_product_record(pid).await.unwrap().unwrap();
    assert_eq!(product.stock, 5);
}

#[tokio::test]
async fn empty_cart_cannot_check_out() {
    let db = support::new_db().await;
    let owner = Owner::user("alice");
    let api = support::checkout_api(&db);
    let err = api.checkout(&support::customer(owner), request_with_address()).await.unwrap_err();
    assert!(matches!(err, CheckoutError::EmptyCart));
}

#[tokio::test]
async fn oversold_confirmation_rolls_back() {
    let db = support::new_db().await;
    let pid = support::seed_product(&db, "Last one", 10_000, 1).await;
    let alice = Owner::user("alice");
    let bob = Owner::user("bob");
    let carts = CartApi::new(db.clone(), PricingConfig::default());
    carts.add_item(&alice, pid, 1).await.unwrap();
    carts.add_item(&bob, pid, 1).await.unwrap();

    // both buyers check out the final unit before either payment lands
    let api = support::checkout_api(&db);
    let alice_order = api.checkout(&support::customer(alice.clone()), request_with_address()).await.unwrap().order;
    let bob_order = api.checkout(&support::customer(bob.clone()), request_with_address()).await.unwrap().order;

    let verifier = support::verification_api(&db);
    let gw = alice_order.payment.gateway_order_id.clone();
    let sig = support::sign(gw.as_str(), "pay-a");
    let (_, newly) = verifier.verify_payment(&alice, alice_order.id, &gw, "pay-a", &sig).await.unwrap();
    assert!(newly);

    let gw = bob_order.payment.gateway_order_id.clone();
    let sig = support::sign(gw.as_str(), "pay-b");
    let err = verifier.verify_payment(&bob, bob_order.id, &gw, "pay-b", &sig).await.unwrap_err();
    assert!(matches!(err, CheckoutError::StockConflict { product_id } if product_id == pid));

    // the failed confirmation left no partial state behind
    let product = db.fetch_product_record(pid).await.unwrap().unwrap();
    assert_eq!(product.stock, 0);
    assert_eq!(product.sales, 1);
    let order = db.fetch_order(bob_order.id, &bob).await.unwrap().unwrap();
    assert_eq!(order.payment.status, PaymentStatus::Pending);
    assert_eq!(order.status, OrderStatus::Pending);
}

#[tokio::test]
async fn missing_address_falls_back_to_the_address_book() {
    use checkout_engine::CheckoutApi;
    let db = support::new_db().await;
    let pid = support::seed_product(&db, "Widget", 10_000, 5).await;
    let owner = Owner::user("alice");
    let carts = CartApi::new(db.clone(), PricingConfig::default());
    carts.add_item(&owner, pid, 1).await.unwrap();

    // no address in the request and none on file
    let api = support::checkout_api(&db);
    let err = api.checkout(&support::customer(owner.clone()), CheckoutRequest::default()).await.unwrap_err();
    assert!(matches!(err, CheckoutError::NoAddressAvailable));

    // with a default address on file the same request succeeds
    let api = CheckoutApi::new(
        db.clone(),
        support::TestGateway::default(),
        support::DefaultAddressBook,
        PricingConfig::default(),
    );
    let result = api.checkout(&support::customer(owner), CheckoutRequest::default()).await.unwrap();
    assert_eq!(result.order.billing_address, support::address());
    assert_eq!(result.order.shipping_address, support::address());
}

#[tokio::test]
async fn incomplete_address_is_refused() {
    let db = support::new_db().await;
    let pid = support::seed_product(&db, "Widget", 10_000, 5).await;
    let owner = Owner::user("alice");
    let carts = CartApi::new(db.clone(), PricingConfig::default());
    carts.add_item(&owner, pid, 1).await.unwrap();

    let mut address = support::address();
    address.postcode = String::new();
    let api = support::checkout_api(&db);
    let request = CheckoutRequest { billing_address: Some(address), ..Default::default() };
    let err = api.checkout(&support::customer(owner), request).await.unwrap_err();
    assert!(matches!(err, CheckoutError::IncompleteAddress { which: "billing", field: "postcode" }));
}

#[tokio::test]
async fn single_item_checkout_leaves_the_cart_alone() {
    let db = support::new_db().await;
    let in_cart = support::seed_product(&db, "Widget", 10_000, 5).await;
    let direct = support::seed_product(&db, "Gadget", 5_000, 5).await;
    let owner = Owner::user("alice");
    let carts = CartApi::new(db.clone(), PricingConfig::default());
    carts.add_item(&owner, in_cart, 1).await.unwrap();

    let api = support::checkout_api(&db);
    let result = api
        .checkout_single_item(&support::customer(owner.clone()), direct, 2, request_with_address())
        .await
        .unwrap();
    let order = result.order;
    assert_eq!(order.cart_id, None);
    assert_eq!(order.items.len(), 1);
    assert_eq!(order.items[0].quantity, 2);
    assert_eq!(order.subtotal, Money::from(10_000));

    let verifier = support::verification_api(&db);
    let gw = order.payment.gateway_order_id.clone();
    let sig = support::sign(gw.as_str(), "pay-1");
    let (_, newly) = verifier.verify_payment(&owner, order.id, &gw, "pay-1", &sig).await.unwrap();
    assert!(newly);

    // the cart survived the direct purchase untouched
    let cart = carts.cart(&owner).await.unwrap().expect("cart must still be active");
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].product_id, in_cart);
}

#[tokio::test]
async fn verification_requires_the_full_order_identity() {
    let db = support::new_db().await;
    let pid = support::seed_product(&db, "Widget", 10_000, 5).await;
    let owner = Owner::user("alice");
    let carts = CartApi::new(db.clone(), PricingConfig::default());
    carts.add_item(&owner, pid, 1).await.unwrap();
    let api = support::checkout_api(&db);
    let result = api.checkout(&support::customer(owner.clone()), request_with_address()).await.unwrap();
    let gw = result.order.payment.gateway_order_id.clone();

    // wrong owner
    let verifier = support::verification_api(&db);
    let sig = support::sign(gw.as_str(), "pay-1");
    let err = verifier.verify_payment(&Owner::user("mallory"), result.order.id, &gw, "pay-1", &sig).await.unwrap_err();
    assert!(matches!(err, CheckoutError::OrderNotFound));

    // wrong gateway order id (validly signed for that id)
    let other = checkout_engine::db_types::GatewayOrderId("gw-9999".to_string());
    let sig = support::sign(other.as_str(), "pay-1");
    let err = verifier.verify_payment(&owner, result.order.id, &other, "pay-1", &sig).await.unwrap_err();
    assert!(matches!(err, CheckoutError::OrderNotFound));
}
