use thiserror::Error;

use crate::{
    db_types::{GatewayOrderId, NewOrder, NewPaymentAudit, Order, Owner, PaymentAudit, Product},
    traits::CartError,
};

/// The gateway payment identifiers and signature recorded onto an order when its payment is confirmed.
#[derive(Debug, Clone)]
pub struct PaymentConfirmation {
    pub gateway_payment_id: String,
    pub signature: String,
}

/// Storage contract for the checkout and verification flows.
#[allow(async_fn_in_trait)]
pub trait CheckoutDatabase: Clone {
    /// Fetches the current product record. Checkout re-verifies every cart line against this, not against the
    /// cart's snapshot, because stock may have moved between add-to-cart and checkout.
    async fn fetch_product(&self, product_id: i64) -> Result<Option<Product>, CheckoutError>;

    /// Records a new payment-intent attempt in the audit ledger with `Initiated` status. This commit happens
    /// before the order insert, so that a failed order write leaves a reconcilable audit row keyed by the
    /// gateway's order id rather than losing the payment history.
    async fn insert_payment_audit(&self, audit: NewPaymentAudit) -> Result<PaymentAudit, CheckoutError>;

    /// Marks an audit row as `Failed` with the given reason. Finalized rows (`Success`, `Refunded`) are left
    /// untouched. Best-effort callers log failures and move on.
    async fn record_audit_failure(&self, gateway_order_id: &GatewayOrderId, reason: &str)
        -> Result<(), CheckoutError>;

    /// Persists the order snapshot (header, lines, opening timeline entry) in a single atomic transaction.
    async fn create_order(&self, order: NewOrder) -> Result<Order, CheckoutError>;

    /// Fetches an order by internal id and owner, with its lines populated.
    async fn fetch_order(&self, order_id: i64, owner: &Owner) -> Result<Option<Order>, CheckoutError>;

    /// Fetches the order matching all three of internal id, owner, and gateway order id. Verification refuses to
    /// act on anything weaker than this triple.
    async fn fetch_order_for_verification(
        &self,
        order_id: i64,
        owner: &Owner,
        gateway_order_id: &GatewayOrderId,
    ) -> Result<Option<Order>, CheckoutError>;

    /// Fetches an audit ledger entry by the gateway's order id.
    async fn fetch_audit_by_gateway_order_id(
        &self,
        gateway_order_id: &GatewayOrderId,
    ) -> Result<Option<PaymentAudit>, CheckoutError>;

    /// Applies the confirmed-payment side effects in one atomic transaction:
    ///
    /// 1. order: payment status → `Paid`, `paid_at` stamped, gateway payment id and signature recorded, status →
    ///    `Confirmed`, timeline entry appended;
    /// 2. audit ledger: → `Success`, `completed_at` stamped;
    /// 3. every finite-stock line: sales incremented and stock decremented by the line quantity, guarded so that
    ///    stock can never go negative — a guard failure aborts the whole transaction;
    /// 4. the producing cart is deactivated.
    ///
    /// The order's payment status is re-read inside the transaction immediately before mutating. If it is already
    /// `Paid`, nothing is applied and the order is returned with `false`, so replaying a confirmation can never
    /// double-decrement stock or double-count sales.
    async fn confirm_payment(
        &self,
        order_id: i64,
        owner: &Owner,
        gateway_order_id: &GatewayOrderId,
        confirmation: PaymentConfirmation,
    ) -> Result<(Order, bool), CheckoutError>;
}

#[derive(Debug, Clone, Error)]
pub enum CheckoutError {
    #[error("We have an internal database engine error: {0}")]
    DatabaseError(String),
    #[error("The cart is empty")]
    EmptyCart,
    #[error("The {field} field of the {which} address is required")]
    IncompleteAddress { which: &'static str, field: &'static str },
    #[error("No address supplied, and no default address is on file for this customer")]
    NoAddressAvailable,
    #[error("No customer email is available for the order confirmation")]
    MissingCustomerEmail,
    #[error("Product {0} is not available for purchase")]
    ProductUnavailable(i64),
    #[error("Insufficient stock for product {product_id}: {available} units available, {requested} requested")]
    InsufficientStock { product_id: i64, requested: i64, available: i64 },
    #[error("Product {0} does not exist")]
    ProductNotFound(i64),
    #[error("The requested order does not exist")]
    OrderNotFound,
    #[error("No payment audit entry exists for gateway order {0}")]
    AuditNotFound(GatewayOrderId),
    #[error("Payment signature verification failed")]
    SignatureMismatch,
    #[error("The payment gateway rejected the request: {0}")]
    GatewayError(String),
    #[error("Confirmed payment would drive stock negative for product {product_id}")]
    StockConflict { product_id: i64 },
    #[error(transparent)]
    Cart(#[from] CartError),
}

impl From<sqlx::Error> for CheckoutError {
    fn from(e: sqlx::Error) -> Self {
        CheckoutError::DatabaseError(e.to_string())
    }
}
