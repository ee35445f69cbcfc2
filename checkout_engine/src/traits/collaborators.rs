//! Contracts for the engine's external collaborators.
//!
//! The payment gateway, notification service and address book live outside this system. The engine defines only
//! the narrow interfaces it requires from them, and concrete clients are constructed once at process start and
//! injected explicitly — there are no process-wide singletons, so tests substitute in-memory doubles freely.

use serde::{Deserialize, Serialize};
use shop_common::Money;
use thiserror::Error;

use crate::db_types::{Address, GatewayOrderId, Order, Owner};

//--------------------------------------   Payment gateway    --------------------------------------------------------
/// A request for the gateway to open a payment intent. The amount is a positive integer in the currency's minor
/// unit; the currency is fixed per deployment region.
#[derive(Debug, Clone, Serialize)]
pub struct IntentRequest {
    pub amount: Money,
    pub currency: String,
    pub metadata: serde_json::Value,
}

/// A provider-side payment authorization handle, created before the buyer completes payment. The client token is
/// handed back to the caller so they can complete authorization through the gateway's own hosted flow.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    pub gateway_order_id: GatewayOrderId,
    pub client_token: String,
}

#[allow(async_fn_in_trait)]
pub trait PaymentGateway: Clone {
    /// The gateway's name, recorded in the payment audit ledger.
    fn name(&self) -> &str;

    /// Asks the gateway to create a payment intent for the given amount. A timed-out call must be treated as
    /// failed; the recovery path is a fresh checkout attempt, never a retry of the half-finished one.
    async fn create_intent(&self, request: IntentRequest) -> Result<PaymentIntent, GatewayClientError>;
}

#[derive(Debug, Clone, Error)]
pub enum GatewayClientError {
    #[error("The gateway rejected the payment intent ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("Could not reach the payment gateway: {0}")]
    Transport(String),
    #[error("The gateway returned an unparseable response: {0}")]
    InvalidResponse(String),
}

//-------------------------------------- Notification service --------------------------------------------------------
#[allow(async_fn_in_trait)]
pub trait NotificationService: Clone {
    /// Sends the order-confirmation message. Failures are logged by the caller and never propagated into the
    /// payment flow: payment confirmation is the source of truth, notification delivery is not.
    async fn send_order_confirmation(
        &self,
        recipient_email: &str,
        recipient_name: &str,
        order: &Order,
    ) -> Result<String, NotificationError>;
}

#[derive(Debug, Clone, Error)]
#[error("Could not deliver notification: {0}")]
pub struct NotificationError(pub String);

//--------------------------------------    Address book      --------------------------------------------------------
#[allow(async_fn_in_trait)]
pub trait AddressBook: Clone {
    /// The owner's default address, if one is on file. Consulted when a checkout request carries no explicit
    /// addresses.
    async fn default_address(&self, owner: &Owner) -> Result<Option<Address>, AddressBookError>;
}

#[derive(Debug, Clone, Error)]
#[error("Address book lookup failed: {0}")]
pub struct AddressBookError(pub String);
