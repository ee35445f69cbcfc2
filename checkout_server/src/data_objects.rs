use checkout_engine::{
    db_types::{GatewayOrderId, OrderStatus, ShippingMethod},
    CheckoutRequest,
};
use serde::{Deserialize, Serialize};
use shop_common::Money;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddItemRequest {
    pub product_id: i64,
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingRequest {
    pub method: ShippingMethod,
}

/// Checkout for a single product, bypassing the cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuyNowRequest {
    pub product_id: i64,
    pub quantity: i64,
    #[serde(flatten)]
    pub details: CheckoutRequest,
}

/// The gateway's payment callback, relayed to `/checkout/verify` once the buyer has authorized payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyPaymentRequest {
    pub order_id: i64,
    pub gateway_order_id: GatewayOrderId,
    pub gateway_payment_id: String,
    pub signature: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRequest {
    pub to: OrderStatus,
    #[serde(default)]
    pub note: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelRequest {
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundRequest {
    pub amount: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockAdjustment {
    pub delta: i64,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn buy_now_request_flattens_the_checkout_details() {
        let json = r#"{
            "product_id": 7,
            "quantity": 2,
            "billing_address": {
                "name": "Jo Soap",
                "line1": "1 Main St",
                "city": "Springfield",
                "postcode": "1234",
                "country": "US"
            },
            "notes": "gift wrap please"
        }"#;
        let req: BuyNowRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.product_id, 7);
        assert_eq!(req.quantity, 2);
        assert_eq!(req.details.notes.as_deref(), Some("gift wrap please"));
        assert_eq!(req.details.billing_address.unwrap().city, "Springfield");
        assert!(req.details.shipping_address.is_none());
    }

    #[test]
    fn transition_note_defaults_to_empty() {
        let req: TransitionRequest = serde_json::from_str(r#"{"to": "processing"}"#).unwrap();
        assert_eq!(req.to, OrderStatus::Processing);
        assert!(req.note.is_empty());
    }
}
