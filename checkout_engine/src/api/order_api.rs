use std::fmt::Debug;

use log::*;
use shop_common::Money;

use crate::{
    db_types::{Order, OrderStatus, Owner, TimelineEntry},
    events::{EventProducers, OrderAnnulledEvent},
    traits::{OrderLifecycleError, OrderManagement},
};

/// `OrderLifecycleApi` manages everything that happens to an order after payment: fulfilment transitions,
/// cancellation requests and approvals, and refunds. Every write is status-checked at the SQL level, so two
/// concurrent operators cannot double-apply a transition.
pub struct OrderLifecycleApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for OrderLifecycleApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderLifecycleApi")
    }
}

impl<B> OrderLifecycleApi<B>
where B: OrderManagement
{
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }

    pub async fn order(&self, order_id: i64) -> Result<Option<Order>, OrderLifecycleError> {
        self.db.fetch_order_by_id(order_id).await
    }

    pub async fn timeline(&self, order_id: i64) -> Result<Vec<TimelineEntry>, OrderLifecycleError> {
        self.db.fetch_timeline(order_id).await
    }

    /// Moves the order to `to` from its current status, appending a timeline entry that records who drove the
    /// transition. The current status is read first and passed as the expected state, so a concurrent transition
    /// surfaces as a conflict, not a skip.
    pub async fn advance_status(
        &self,
        order_id: i64,
        to: OrderStatus,
        note: &str,
        actor: &str,
    ) -> Result<Order, OrderLifecycleError> {
        let order =
            self.db.fetch_order_by_id(order_id).await?.ok_or(OrderLifecycleError::OrderNotFound(order_id))?;
        let entry =
            if note.is_empty() { format!("Status changed by {actor}") } else { format!("{note} (by {actor})") };
        self.db.transition_status(order_id, order.status, to, &entry).await
    }

    /// Records the owner's cancellation request. The order must still be cancellable; approval is a separate,
    /// operator-driven step.
    pub async fn request_cancellation(
        &self,
        order_id: i64,
        owner: &Owner,
        reason: &str,
    ) -> Result<Order, OrderLifecycleError> {
        let order = self.db.record_cancellation_request(order_id, owner, reason).await?;
        info!("📦️ Cancellation of order {order_id} requested by {owner}");
        Ok(order)
    }

    pub async fn approve_cancellation(&self, order_id: i64) -> Result<Order, OrderLifecycleError> {
        let order = self.db.approve_cancellation(order_id).await?;
        self.call_order_annulled_hook(&order).await;
        Ok(order)
    }

    /// Accumulates a refund against the order. Once the refunded total reaches the order total, the order moves
    /// to `Refunded` and the payment ledger entry is marked accordingly.
    pub async fn record_refund(&self, order_id: i64, amount: Money) -> Result<Order, OrderLifecycleError> {
        let order = self.db.record_refund(order_id, amount).await?;
        if order.status == OrderStatus::Refunded {
            self.call_order_annulled_hook(&order).await;
        }
        Ok(order)
    }

    async fn call_order_annulled_hook(&self, order: &Order) {
        for emitter in &self.producers.order_annulled_producer {
            debug!("📦️ Notifying order annulled hook subscribers");
            let event = OrderAnnulledEvent { order: order.clone() };
            emitter.publish_event(event).await;
        }
    }
}
