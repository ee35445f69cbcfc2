use crate::db_types::Order;

/// Emitted after a payment confirmation transaction commits. Subscribers typically dispatch the
/// order-confirmation notification; their failure never rolls the confirmation back.
#[derive(Clone, Debug)]
pub struct OrderConfirmedEvent {
    pub order: Order,
}

/// Emitted when an order is cancelled or refunded through the lifecycle manager.
#[derive(Clone, Debug)]
pub struct OrderAnnulledEvent {
    pub order: Order,
}
