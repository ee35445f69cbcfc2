//! Interface contracts of the reconciliation engine.
//!
//! ## Database traits
//! Backends expose the engine's storage behaviour through four traits:
//!
//! * [`CartManagement`] owns cart state: line items, coupons, shipping selection and the derived totals. It is the
//!   only writer of cart rows.
//! * [`CheckoutDatabase`] owns the checkout and verification flows: order snapshots, the payment audit ledger and
//!   the exactly-once payment confirmation transaction.
//! * [`OrderManagement`] owns post-checkout status transitions, cancellations and refunds.
//! * [`InventoryManagement`] owns product stock. Stock and sales columns are written here and in the confirmation
//!   transaction, nowhere else.
//!
//! ## Collaborator traits
//! The payment gateway, notification service and address book are external systems. [`collaborators`] defines the
//! narrow interfaces the engine requires from them; concrete clients are injected at construction time so tests
//! can substitute doubles without global state.
mod cart_management;
mod checkout_database;
pub mod collaborators;
mod inventory_management;
mod order_management;

pub use cart_management::{CartError, CartManagement};
pub use checkout_database::{CheckoutDatabase, CheckoutError, PaymentConfirmation};
pub use collaborators::{
    AddressBook,
    AddressBookError,
    GatewayClientError,
    IntentRequest,
    NotificationError,
    NotificationService,
    PaymentGateway,
    PaymentIntent,
};
pub use inventory_management::{InventoryError, InventoryManagement};
pub use order_management::{OrderLifecycleError, OrderManagement};
