use std::fmt::Debug;

use chrono::Utc;
use log::*;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    db_types::{
        Address,
        Cart,
        CartItem,
        Coupon,
        CustomerProfile,
        NewOrder,
        NewOrderItem,
        NewPaymentAudit,
        Order,
        ShippingMethod,
    },
    helpers::{CartTotals, PricingConfig},
    traits::{AddressBook, CheckoutDatabase, CheckoutError, IntentRequest, PaymentGateway},
};

/// The caller-supplied portion of a checkout. Both addresses are optional; each falls back to the other, and when
/// neither is given, the customer's default address from the address book is used for both.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub billing_address: Option<Address>,
    pub shipping_address: Option<Address>,
    pub notes: Option<String>,
}

/// The outcome of a successful checkout: the pending order, and the gateway's client token with which the buyer
/// completes payment authorization.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutResult {
    pub order: Order,
    pub client_token: String,
}

/// `CheckoutApi` drives the conversion of an active cart into a pending order.
///
/// The flow is deliberately ordered so that a crash at any point leaves reconcilable state: cart lines are
/// re-verified against the live catalog, the payment intent is opened at the gateway, the audit ledger entry is
/// committed, and only then is the order snapshot written. A failed order write downgrades the audit entry rather
/// than losing the payment history.
pub struct CheckoutApi<B, G, A> {
    db: B,
    gateway: G,
    address_book: A,
    pricing: PricingConfig,
}

impl<B, G, A> Debug for CheckoutApi<B, G, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CheckoutApi")
    }
}

struct VerifiedLines {
    items: Vec<NewOrderItem>,
    totals: CartTotals,
}

impl<B, G, A> CheckoutApi<B, G, A>
where
    B: CheckoutDatabase + crate::traits::CartManagement,
    G: PaymentGateway,
    A: AddressBook,
{
    pub fn new(db: B, gateway: G, address_book: A, pricing: PricingConfig) -> Self {
        Self { db, gateway, address_book, pricing }
    }

    /// Converts the customer's active cart into a pending order. The cart stays active until the payment is
    /// verified, so an abandoned payment attempt costs nothing.
    pub async fn checkout(
        &self,
        customer: &CustomerProfile,
        request: CheckoutRequest,
    ) -> Result<CheckoutResult, CheckoutError> {
        let cart = self.db.fetch_active_cart(&customer.owner).await?.ok_or(CheckoutError::EmptyCart)?;
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        let lines = self.verify_lines(&cart.items, &cart.coupons, cart.shipping_method).await?;
        debug!("🛒️ Cart {} verified for {}: total is {}", cart.id, customer.owner, lines.totals.total);
        self.place_order(customer, request, lines, cart.shipping_method, Some(cart)).await
    }

    /// Buys a single product directly, bypassing the cart. The order snapshot is identical to a one-line cart
    /// checkout; the customer's active cart, if any, is untouched.
    pub async fn checkout_single_item(
        &self,
        customer: &CustomerProfile,
        product_id: i64,
        quantity: i64,
        request: CheckoutRequest,
    ) -> Result<CheckoutResult, CheckoutError> {
        let now = Utc::now();
        let product =
            self.db.fetch_product(product_id).await?.ok_or(CheckoutError::ProductNotFound(product_id))?;
        if !product.is_available() {
            return Err(CheckoutError::ProductUnavailable(product_id));
        }
        if let Some(available) = product.available_stock() {
            if quantity > available {
                return Err(CheckoutError::InsufficientStock { product_id, requested: quantity, available });
            }
        }
        let item = NewOrderItem {
            product_id,
            title: product.title.clone(),
            unit_price: product.price,
            discounted_price: product.effective_price(now),
            quantity,
        };
        let totals = totals_for(&[item.clone()], &[], ShippingMethod::Standard, &self.pricing);
        let lines = VerifiedLines { items: vec![item], totals };
        self.place_order(customer, request, lines, ShippingMethod::Standard, None).await
    }

    /// Re-verifies every line against the live product record and reprices from scratch. Stock may have moved
    /// since the lines were added, so the cart's own snapshot is never trusted here.
    async fn verify_lines(
        &self,
        items: &[CartItem],
        coupons: &[Coupon],
        shipping_method: ShippingMethod,
    ) -> Result<VerifiedLines, CheckoutError> {
        let now = Utc::now();
        let mut fresh = Vec::with_capacity(items.len());
        for item in items {
            let product = self
                .db
                .fetch_product(item.product_id)
                .await?
                .ok_or(CheckoutError::ProductNotFound(item.product_id))?;
            if !product.is_available() {
                return Err(CheckoutError::ProductUnavailable(item.product_id));
            }
            if let Some(available) = product.available_stock() {
                if item.quantity > available {
                    return Err(CheckoutError::InsufficientStock {
                        product_id: item.product_id,
                        requested: item.quantity,
                        available,
                    });
                }
            }
            fresh.push(NewOrderItem {
                product_id: product.id,
                title: product.title.clone(),
                unit_price: product.price,
                discounted_price: product.effective_price(now),
                quantity: item.quantity,
            });
        }
        let totals = totals_for(&fresh, coupons, shipping_method, &self.pricing);
        Ok(VerifiedLines { items: fresh, totals })
    }

    async fn place_order(
        &self,
        customer: &CustomerProfile,
        request: CheckoutRequest,
        lines: VerifiedLines,
        shipping_method: ShippingMethod,
        cart: Option<Cart>,
    ) -> Result<CheckoutResult, CheckoutError> {
        let (billing, shipping) = self.resolve_addresses(customer, &request).await?;
        // the order must carry an address for the confirmation message: billing email first, then the profile's
        let customer_email =
            billing.email.clone().filter(|e| !e.trim().is_empty()).unwrap_or_else(|| customer.email.clone());
        if customer_email.trim().is_empty() {
            return Err(CheckoutError::MissingCustomerEmail);
        }
        let cart_id = cart.as_ref().map(|c| c.id);
        let metadata = json!({
            "owner": customer.owner.to_string(),
            "cart_id": cart_id,
            "shipping_method": shipping_method.to_string(),
        });
        // Gateways refuse zero-value intents, so a fully discounted order still authorizes a nominal amount.
        let amount = lines.totals.total.at_least(1);
        let intent_request = IntentRequest { amount, currency: self.pricing.currency.clone(), metadata };
        // No audit row exists yet at this point: the ledger is keyed by the gateway's order id, which is only
        // assigned once an intent is created. A rejection here leaves no state behind.
        let intent = match self.gateway.create_intent(intent_request).await {
            Ok(intent) => intent,
            Err(e) => {
                warn!("🛒️ The gateway refused a payment intent for {}: {e}", customer.owner);
                return Err(CheckoutError::GatewayError(e.to_string()));
            },
        };
        let audit = NewPaymentAudit {
            gateway_order_id: intent.gateway_order_id.clone(),
            gateway: self.gateway.name().to_string(),
            owner: customer.owner.clone(),
            amount,
            currency: self.pricing.currency.clone(),
        };
        // The audit entry commits before the order insert. If the order write then fails, the payment attempt is
        // still reconcilable by its gateway order id.
        self.db.insert_payment_audit(audit).await?;
        let order = NewOrder {
            owner: customer.owner.clone(),
            cart_id,
            customer_name: customer.name.clone(),
            customer_email,
            billing_address: billing,
            shipping_address: shipping,
            notes: request.notes,
            subtotal: lines.totals.subtotal,
            discount: lines.totals.discount,
            tax: lines.totals.tax,
            shipping_cost: lines.totals.shipping_cost,
            total: lines.totals.total,
            currency: self.pricing.currency.clone(),
            gateway: self.gateway.name().to_string(),
            gateway_order_id: intent.gateway_order_id.clone(),
            items: lines.items,
        };
        let order = match self.db.create_order(order).await {
            Ok(order) => order,
            Err(e) => {
                warn!("🛒️ Order write for gateway order {} failed: {e}", intent.gateway_order_id);
                if let Err(audit_err) =
                    self.db.record_audit_failure(&intent.gateway_order_id, &e.to_string()).await
                {
                    error!(
                        "🛒️ Could not record the failure against audit entry {}: {audit_err}",
                        intent.gateway_order_id
                    );
                }
                return Err(e);
            },
        };
        info!(
            "🛒️ Order {} created for {} against gateway order {}. Awaiting payment.",
            order.id, customer.owner, order.payment.gateway_order_id
        );
        Ok(CheckoutResult { order, client_token: intent.client_token })
    }

    /// Billing falls back to shipping, shipping falls back to billing, and when neither is supplied the address
    /// book's default serves as both. Each resolved address must pass the completeness check.
    async fn resolve_addresses(
        &self,
        customer: &CustomerProfile,
        request: &CheckoutRequest,
    ) -> Result<(Address, Address), CheckoutError> {
        let (billing, shipping) = match (&request.billing_address, &request.shipping_address) {
            (Some(b), Some(s)) => (b.clone(), s.clone()),
            (Some(b), None) => (b.clone(), b.clone()),
            (None, Some(s)) => (s.clone(), s.clone()),
            (None, None) => {
                let default = self
                    .address_book
                    .default_address(&customer.owner)
                    .await
                    .map_err(|e| CheckoutError::DatabaseError(e.to_string()))?
                    .ok_or(CheckoutError::NoAddressAvailable)?;
                (default.clone(), default)
            },
        };
        if let Some(field) = billing.first_missing_field() {
            return Err(CheckoutError::IncompleteAddress { which: "billing", field });
        }
        if let Some(field) = shipping.first_missing_field() {
            return Err(CheckoutError::IncompleteAddress { which: "shipping", field });
        }
        Ok((billing, shipping))
    }
}

fn totals_for(
    items: &[NewOrderItem],
    coupons: &[Coupon],
    shipping_method: ShippingMethod,
    pricing: &PricingConfig,
) -> CartTotals {
    let now = Utc::now();
    let as_lines = items
        .iter()
        .map(|i| CartItem {
            id: 0,
            cart_id: 0,
            product_id: i.product_id,
            title: i.title.clone(),
            unit_price: i.unit_price,
            discounted_price: i.discounted_price,
            quantity: i.quantity,
            created_at: now,
            updated_at: now,
        })
        .collect::<Vec<_>>();
    CartTotals::compute(&as_lines, coupons, pricing.shipping_cost(shipping_method), pricing.tax_rate_bp)
}
