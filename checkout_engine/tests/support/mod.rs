#![allow(dead_code)]
pub mod prepare_env;

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use checkout_engine::{
    db_types::{Address, CustomerProfile, GatewayOrderId, NewProduct, Owner},
    events::EventProducers,
    helpers::{payment_signature, PricingConfig},
    traits::{
        AddressBook,
        AddressBookError,
        GatewayClientError,
        IntentRequest,
        InventoryManagement,
        PaymentGateway,
        PaymentIntent,
    },
    CheckoutApi,
    SqliteDatabase,
    VerificationApi,
};
use shop_common::{Money, Secret};

pub const CALLBACK_SECRET: &str = "test-callback-secret";

pub fn callback_secret() -> Secret<String> {
    Secret::new(CALLBACK_SECRET.to_string())
}

pub fn sign(gateway_order_id: &str, gateway_payment_id: &str) -> String {
    payment_signature(&callback_secret(), gateway_order_id, gateway_payment_id)
}

pub async fn new_db() -> SqliteDatabase {
    let url = prepare_env::random_db_path();
    prepare_env::prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database")
}

pub fn customer(owner: Owner) -> CustomerProfile {
    CustomerProfile { owner, name: "Jo Soap".to_string(), email: "jo@example.com".to_string() }
}

pub fn address() -> Address {
    Address {
        name: "Jo Soap".into(),
        line1: "1 Main Rd".into(),
        line2: None,
        city: "Springfield".into(),
        state: None,
        postcode: "1234".into(),
        country: "US".into(),
        email: None,
        phone: None,
    }
}

pub async fn seed_product(db: &SqliteDatabase, title: &str, price: i64, stock: i64) -> i64 {
    let product =
        db.insert_product(NewProduct::new(title, Money::from(price), stock)).await.expect("Error inserting product");
    product.id
}

/// A gateway double that hands out sequential intent ids without leaving the process.
#[derive(Clone, Default)]
pub struct TestGateway {
    counter: Arc<AtomicU64>,
}

impl PaymentGateway for TestGateway {
    fn name(&self) -> &str {
        "testpay"
    }

    async fn create_intent(&self, _request: IntentRequest) -> Result<PaymentIntent, GatewayClientError> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(PaymentIntent {
            gateway_order_id: GatewayOrderId(format!("gw-{n:04}")),
            client_token: format!("tok-{n:04}"),
        })
    }
}

/// A gateway double that refuses every intent.
#[derive(Clone, Default)]
pub struct RefusingGateway;

impl PaymentGateway for RefusingGateway {
    fn name(&self) -> &str {
        "testpay"
    }

    async fn create_intent(&self, _request: IntentRequest) -> Result<PaymentIntent, GatewayClientError> {
        Err(GatewayClientError::Rejected { status: 402, message: "insufficient merchant balance".to_string() })
    }
}

#[derive(Clone)]
pub struct NoAddressBook;

impl AddressBook for NoAddressBook {
    async fn default_address(&self, _owner: &Owner) -> Result<Option<Address>, AddressBookError> {
        Ok(None)
    }
}

#[derive(Clone)]
pub struct DefaultAddressBook;

impl AddressBook for DefaultAddressBook {
    async fn default_address(&self, _owner: &Owner) -> Result<Option<Address>, AddressBookError> {
        Ok(Some(address()))
    }
}

pub fn checkout_api(db: &SqliteDatabase) -> CheckoutApi<SqliteDatabase, TestGateway, NoAddressBook> {
    CheckoutApi::new(db.clone(), TestGateway::default(), NoAddressBook, PricingConfig::default())
}

pub fn verification_api(db: &SqliteDatabase) -> VerificationApi<SqliteDatabase> {
    VerificationApi::new(db.clone(), callback_secret(), EventProducers::default())
}
