use std::fmt::Debug;

use log::*;
use shop_common::Secret;

use crate::{
    db_types::{GatewayOrderId, Order, Owner},
    events::{EventProducers, OrderConfirmedEvent},
    helpers::verify_payment_signature,
    traits::{CheckoutDatabase, CheckoutError, PaymentConfirmation},
};

/// `VerificationApi` reconciles gateway payment callbacks against pending orders.
///
/// The signature gate runs before anything is read from the database, so a forged callback costs one HMAC
/// comparison and a ledger annotation. A verified callback is applied atomically through
/// [`CheckoutDatabase::confirm_payment`], and the confirmation hook fires only when this call, rather than an
/// earlier replay, applied the side effects.
pub struct VerificationApi<B> {
    db: B,
    secret: Secret<String>,
    producers: EventProducers,
}

impl<B> Debug for VerificationApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "VerificationApi")
    }
}

impl<B> VerificationApi<B>
where B: CheckoutDatabase
{
    pub fn new(db: B, secret: Secret<String>, producers: EventProducers) -> Self {
        Self { db, secret, producers }
    }

    /// Verifies a payment callback and applies the confirmation. Returns the order and whether this call newly
    /// confirmed it; a replayed callback returns `(order, false)` without touching anything.
    pub async fn verify_payment(
        &self,
        owner: &Owner,
        order_id: i64,
        gateway_order_id: &GatewayOrderId,
        gateway_payment_id: &str,
        signature: &str,
    ) -> Result<(Order, bool), CheckoutError> {
        if !verify_payment_signature(&self.secret, gateway_order_id.as_str(), gateway_payment_id, signature) {
            warn!("🔐️ Signature verification failed for gateway order {gateway_order_id}");
            if let Err(e) = self.db.record_audit_failure(gateway_order_id, "Signature verification failed").await {
                debug!("🔐️ Could not annotate the audit ledger for {gateway_order_id}: {e}");
            }
            return Err(CheckoutError::SignatureMismatch);
        }
        let confirmation = PaymentConfirmation {
            gateway_payment_id: gateway_payment_id.to_string(),
            signature: signature.to_string(),
        };
        let (order, newly_confirmed) =
            self.db.confirm_payment(order_id, owner, gateway_order_id, confirmation).await?;
        if newly_confirmed {
            self.call_order_confirmed_hook(&order).await;
        } else {
            debug!("🔐️ Callback replay for order {order_id} ignored");
        }
        Ok((order, newly_confirmed))
    }

    async fn call_order_confirmed_hook(&self, order: &Order) {
        for emitter in &self.producers.order_confirmed_producer {
            debug!("🔐️ Notifying order confirmed hook subscribers");
            let event = OrderConfirmedEvent { order: order.clone() };
            emitter.publish_event(event).await;
        }
    }
}
