//! Checkout-to-Payment Reconciliation Engine
//!
//! This library converts a shopping cart into a durable order, coordinates with an external payment gateway, and
//! reconciles the gateway's asynchronous confirmation with internal state: order status, the payment audit ledger,
//! product inventory and the cart lifecycle. It is provider-agnostic.
//!
//! The library is divided into three main sections:
//! 1. Database management and control ([`mod@sqlite`]). SQLite is the supported backend. You should never need to
//!    access the database directly; use the public APIs instead. The exception is the data types used in the
//!    database, which are defined in the [`mod@db_types`] module and are public.
//! 2. The engine public API ([`mod@api`]). `CartApi` owns cart mutations, `CheckoutApi` turns a cart into an order
//!    and a payment intent, `VerificationApi` applies a gateway confirmation exactly once, `InventoryApi` is the
//!    sole writer of stock, and `OrderLifecycleApi` governs post-checkout status transitions. Backends implement
//!    the traits in [`mod@traits`] to drive these APIs.
//! 3. Collaborator contracts ([`traits::collaborators`]). The payment gateway, notification service and address
//!    book are external systems; the engine only defines the interfaces it requires from them, and they are
//!    injected explicitly at construction time.
//!
//! The engine also emits events when key actions occur. When a payment is confirmed, an `OrderConfirmedEvent` is
//! published; a simple actor-style hook system lets you subscribe and perform custom actions, such as sending the
//! order-confirmation notification, without tying their success to the payment flow.
pub mod api;
pub mod db_types;
pub mod events;
pub mod helpers;
pub mod traits;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use api::{CartApi, CheckoutApi, CheckoutRequest, CheckoutResult, InventoryApi, OrderLifecycleApi, VerificationApi};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use traits::{
    AddressBook,
    CartError,
    CartManagement,
    CheckoutDatabase,
    CheckoutError,
    InventoryError,
    InventoryManagement,
    NotificationService,
    OrderLifecycleError,
    OrderManagement,
    PaymentGateway,
};
