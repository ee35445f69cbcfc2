use shop_common::Money;
use thiserror::Error;

use crate::db_types::{Order, OrderStatus, Owner, TimelineEntry};

/// Storage contract for post-checkout order lifecycle changes.
///
/// Every write here follows a status-check-then-act pattern: the expected current state is part of the SQL
/// predicate, so two concurrent calls serialize to one application and one conflict instead of a double-apply.
#[allow(async_fn_in_trait)]
pub trait OrderManagement: Clone {
    async fn fetch_order_by_id(&self, order_id: i64) -> Result<Option<Order>, OrderLifecycleError>;

    async fn fetch_timeline(&self, order_id: i64) -> Result<Vec<TimelineEntry>, OrderLifecycleError>;

    /// Moves the order from `from` to `to`, stamping `shipped_at`/`delivered_at` where applicable and appending a
    /// timeline entry. Fails with [`OrderLifecycleError::TransitionConflict`] if the order is no longer in `from`.
    async fn transition_status(
        &self,
        order_id: i64,
        from: OrderStatus,
        to: OrderStatus,
        note: &str,
    ) -> Result<Order, OrderLifecycleError>;

    /// Records a cancellation request. Only permitted while the order is cancellable (`Pending` or `Confirmed`)
    /// and no cancellation has been approved yet; records the reason, the request time, and a pending refund.
    async fn record_cancellation_request(
        &self,
        order_id: i64,
        owner: &Owner,
        reason: &str,
    ) -> Result<Order, OrderLifecycleError>;

    /// Approves a previously requested cancellation, moving the order to `Cancelled`.
    async fn approve_cancellation(&self, order_id: i64) -> Result<Order, OrderLifecycleError>;

    /// Accumulates `amount` against the order's refunded total, deriving `Refunded` vs `PartiallyRefunded` from
    /// the comparison with the order total, and marks the audit ledger entry refunded once fully repaid.
    async fn record_refund(&self, order_id: i64, amount: Money) -> Result<Order, OrderLifecycleError>;
}

#[derive(Debug, Clone, Error)]
pub enum OrderLifecycleError {
    #[error("We have an internal database engine error: {0}")]
    DatabaseError(String),
    #[error("The requested order (internal id {0}) does not exist")]
    OrderNotFound(i64),
    #[error("An order cannot move from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
    #[error("The order is no longer in the {expected} state")]
    TransitionConflict { expected: OrderStatus },
    #[error("Cancellation is not allowed: {0}")]
    CancellationNotAllowed(String),
    #[error("Refund of {requested} exceeds the {remaining} still refundable on this order")]
    ExcessiveRefund { requested: Money, remaining: Money },
    #[error("Refunds only apply to delivered or cancelled orders")]
    RefundNotAllowed,
    #[error("Refund amount must be positive")]
    InvalidRefundAmount,
}

impl From<sqlx::Error> for OrderLifecycleError {
    fn from(e: sqlx::Error) -> Self {
        OrderLifecycleError::DatabaseError(e.to_string())
    }
}
