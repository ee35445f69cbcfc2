//! `SqliteDatabase` is the concrete storage backend for the checkout engine.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`crate::traits`]
//! module. The multi-step flows (cart mutations, order creation, payment confirmation, lifecycle writes) each run
//! inside a single transaction built from the low-level functions in [`super::db`].
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use shop_common::Money;
use sqlx::{SqliteConnection, SqlitePool};

use super::db::{carts, new_pool, orders, payments, products};
use crate::{
    db_types::{
        Cart,
        GatewayOrderId,
        NewCoupon,
        NewOrder,
        NewPaymentAudit,
        NewProduct,
        Order,
        OrderStatus,
        Owner,
        PaymentAudit,
        Product,
        ShippingMethod,
        TimelineEntry,
    },
    helpers::{CartTotals, PricingConfig},
    traits::{
        CartError,
        CartManagement,
        CheckoutDatabase,
        CheckoutError,
        InventoryError,
        InventoryManagement,
        OrderLifecycleError,
        OrderManagement,
        PaymentConfirmation,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Recomputes and persists the derived totals for a cart, returning the repriced cart. An empty cart prices at
/// zero, shipping included.
async fn reprice_cart(
    cart_id: i64,
    pricing: &PricingConfig,
    conn: &mut SqliteConnection,
) -> Result<Cart, CartError> {
    let cart = carts::fetch_cart_by_id(cart_id, &mut *conn).await?.ok_or(CartError::CartNotFound)?;
    let shipping = if cart.is_empty() { Money::from(0) } else { pricing.shipping_cost(cart.shipping_method) };
    let totals = CartTotals::compute(&cart.items, &cart.coupons, shipping, pricing.tax_rate_bp);
    carts::update_totals(cart_id, &totals, &mut *conn).await?;
    let cart = carts::fetch_cart_by_id(cart_id, conn).await?.ok_or(CartError::CartNotFound)?;
    Ok(cart)
}

fn check_stock(product: &Product, requested: i64) -> Result<(), CartError> {
    if let Some(available) = product.available_stock() {
        if requested > available {
            return Err(CartError::InsufficientStock { requested, available });
        }
    }
    Ok(())
}

impl CartManagement for SqliteDatabase {
    async fn fetch_active_cart(&self, owner: &Owner) -> Result<Option<Cart>, CartError> {
        let mut conn = self.pool.acquire().await?;
        let cart = carts::fetch_active_cart(owner, &mut conn).await?;
        Ok(cart)
    }

    async fn add_item(
        &self,
        owner: &Owner,
        product_id: i64,
        quantity: i64,
        pricing: &PricingConfig,
    ) -> Result<Cart, CartError> {
        if quantity < 1 {
            return Err(CartError::InvalidQuantity);
        }
        let mut tx = self.pool.begin().await?;
        let product =
            products::fetch_product_by_id(product_id, &mut tx).await?.ok_or(CartError::ProductNotFound(product_id))?;
        if !product.is_available() {
            tx.rollback().await?;
            return Err(CartError::ProductUnavailable(product_id));
        }
        let cart = carts::fetch_or_create_active_cart(owner, &mut tx).await?;
        let merged = cart.item_for_product(product_id).map(|i| i.quantity).unwrap_or(0) + quantity;
        if let Err(e) = check_stock(&product, merged) {
            // A dropped transaction rolls back asynchronously, which races the caller's next pool connection
            // and surfaces as a spurious "database is locked". Roll back explicitly before every early return.
            tx.rollback().await?;
            return Err(e);
        }
        let price = product.effective_price(Utc::now());
        carts::upsert_item(cart.id, &product, price, merged, &mut tx).await?;
        let cart = reprice_cart(cart.id, pricing, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ {merged} x product {product_id} now in cart {} for {owner}", cart.id);
        Ok(cart)
    }

    async fn update_item_quantity(
        &self,
        owner: &Owner,
        product_id: i64,
        quantity: i64,
        pricing: &PricingConfig,
    ) -> Result<Cart, CartError> {
        if quantity < 1 {
            return Err(CartError::InvalidQuantity);
        }
        let mut tx = self.pool.begin().await?;
        let cart = carts::fetch_active_cart(owner, &mut tx).await?.ok_or(CartError::CartNotFound)?;
        if cart.item_for_product(product_id).is_none() {
            tx.rollback().await?;
            return Err(CartError::ItemNotInCart(product_id));
        }
        let product =
            products::fetch_product_by_id(product_id, &mut tx).await?.ok_or(CartError::ProductNotFound(product_id))?;
        if !product.is_available() {
            tx.rollback().await?;
            return Err(CartError::ProductUnavailable(product_id));
        }
        if let Err(e) = check_stock(&product, quantity) {
            tx.rollback().await?;
            return Err(e);
        }
        let price = product.effective_price(Utc::now());
        carts::upsert_item(cart.id, &product, price, quantity, &mut tx).await?;
        let cart = reprice_cart(cart.id, pricing, &mut tx).await?;
        tx.commit().await?;
        Ok(cart)
    }

    async fn remove_item(&self, owner: &Owner, product_id: i64, pricing: &PricingConfig) -> Result<Cart, CartError> {
        let mut tx = self.pool.begin().await?;
        let cart = carts::fetch_active_cart(owner, &mut tx).await?.ok_or(CartError::CartNotFound)?;
        let removed = carts::delete_item(cart.id, product_id, &mut tx).await?;
        if removed == 0 {
            tx.rollback().await?;
            return Err(CartError::ItemNotInCart(product_id));
        }
        let cart = reprice_cart(cart.id, pricing, &mut tx).await?;
        tx.commit().await?;
        Ok(cart)
    }

    async fn clear_cart(&self, owner: &Owner, pricing: &PricingConfig) -> Result<Cart, CartError> {
        let mut tx = self.pool.begin().await?;
        let cart = carts::fetch_active_cart(owner, &mut tx).await?.ok_or(CartError::CartNotFound)?;
        carts::clear_items(cart.id, &mut tx).await?;
        carts::clear_coupons(cart.id, &mut tx).await?;
        let cart = reprice_cart(cart.id, pricing, &mut tx).await?;
        tx.commit().await?;
        Ok(cart)
    }

    async fn apply_coupon(
        &self,
        owner: &Owner,
        coupon: NewCoupon,
        pricing: &PricingConfig,
    ) -> Result<Cart, CartError> {
        let mut tx = self.pool.begin().await?;
        let cart = carts::fetch_active_cart(owner, &mut tx).await?.ok_or(CartError::CartNotFound)?;
        if cart.is_empty() {
            tx.rollback().await?;
            return Err(CartError::EmptyCart);
        }
        carts::upsert_coupon(cart.id, coupon, &mut tx).await?;
        let cart = reprice_cart(cart.id, pricing, &mut tx).await?;
        tx.commit().await?;
        Ok(cart)
    }

    async fn remove_coupon(&self, owner: &Owner, code: &str, pricing: &PricingConfig) -> Result<Cart, CartError> {
        let mut tx = self.pool.begin().await?;
        let cart = carts::fetch_active_cart(owner, &mut tx).await?.ok_or(CartError::CartNotFound)?;
        carts::delete_coupon(cart.id, code, &mut tx).await?;
        let cart = reprice_cart(cart.id, pricing, &mut tx).await?;
        tx.commit().await?;
        Ok(cart)
    }

    async fn set_shipping(
        &self,
        owner: &Owner,
        method: ShippingMethod,
        pricing: &PricingConfig,
    ) -> Result<Cart, CartError> {
        let mut tx = self.pool.begin().await?;
        let cart = carts::fetch_active_cart(owner, &mut tx).await?.ok_or(CartError::CartNotFound)?;
        carts::set_shipping(cart.id, method, pricing.shipping_cost(method), &mut tx).await?;
        let cart = reprice_cart(cart.id, pricing, &mut tx).await?;
        tx.commit().await?;
        Ok(cart)
    }

    async fn expire_stale_carts(&self, cutoff: DateTime<Utc>) -> Result<u64, CartError> {
        let mut conn = self.pool.acquire().await?;
        let expired = carts::expire_stale(cutoff, &mut conn).await?;
        if expired > 0 {
            info!("🕰️ {expired} stale carts reclaimed");
        }
        Ok(expired)
    }
}

impl CheckoutDatabase for SqliteDatabase {
    async fn fetch_product(&self, product_id: i64) -> Result<Option<Product>, CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        let product = products::fetch_product_by_id(product_id, &mut conn).await?;
        Ok(product)
    }

    async fn insert_payment_audit(&self, audit: NewPaymentAudit) -> Result<PaymentAudit, CheckoutError> {
        // RETURNING goes through fetch_one, so the write must be an explicit transaction or SQLite defers the
        // commit until the pooled connection is next used.
        let mut tx = self.pool.begin().await?;
        let audit = payments::insert_audit(audit, &mut tx).await?;
        tx.commit().await?;
        Ok(audit)
    }

    async fn record_audit_failure(
        &self,
        gateway_order_id: &GatewayOrderId,
        reason: &str,
    ) -> Result<(), CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        let touched = payments::mark_failed(gateway_order_id, reason, &mut conn).await?;
        if touched == 0 {
            return Err(CheckoutError::AuditNotFound(gateway_order_id.clone()));
        }
        Ok(())
    }

    async fn create_order(&self, order: NewOrder) -> Result<Order, CheckoutError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::insert_full_order(order, &mut tx).await?;
        tx.commit().await?;
        Ok(order)
    }

    async fn fetch_order(&self, order_id: i64, owner: &Owner) -> Result<Option<Order>, CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_for_owner(order_id, owner, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_for_verification(
        &self,
        order_id: i64,
        owner: &Owner,
        gateway_order_id: &GatewayOrderId,
    ) -> Result<Option<Order>, CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_for_verification(order_id, owner, gateway_order_id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_audit_by_gateway_order_id(
        &self,
        gateway_order_id: &GatewayOrderId,
    ) -> Result<Option<PaymentAudit>, CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        let audit = payments::fetch_audit_by_gateway_order_id(gateway_order_id, &mut conn).await?;
        Ok(audit)
    }

    /// Applies the confirmed-payment side effects in a single transaction. The order's payment status is re-read
    /// inside the transaction, so a replayed confirmation short-circuits to `(order, false)` before any mutation,
    /// and a stock guard failure rolls the whole confirmation back.
    async fn confirm_payment(
        &self,
        order_id: i64,
        owner: &Owner,
        gateway_order_id: &GatewayOrderId,
        confirmation: PaymentConfirmation,
    ) -> Result<(Order, bool), CheckoutError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order_for_verification(order_id, owner, gateway_order_id, &mut tx)
            .await?
            .ok_or(CheckoutError::OrderNotFound)?;
        if order.payment.status == crate::db_types::PaymentStatus::Paid {
            debug!("🔄️ Payment for order {order_id} is already confirmed. Nothing to do.");
            return Ok((order, false));
        }
        let paid = match orders::mark_paid(order_id, &confirmation, &mut tx).await? {
            Some(order) => order,
            // A concurrent confirmation won the race between our read and write.
            None => return Ok((order, false)),
        };
        orders::append_timeline(order_id, OrderStatus::Confirmed, "Payment confirmed", &mut tx).await?;
        let audit = payments::mark_success(gateway_order_id, &confirmation.gateway_payment_id, &mut tx).await?;
        if audit.is_none() {
            tx.rollback().await?;
            return Err(CheckoutError::AuditNotFound(gateway_order_id.clone()));
        }
        for item in &paid.items {
            let applied = products::apply_confirmed_sale(item.product_id, item.quantity, &mut tx).await?;
            if !applied {
                warn!(
                    "🔄️ Confirmed payment for order {order_id} would drive stock negative for product {}. Rolling \
                     back.",
                    item.product_id
                );
                tx.rollback().await?;
                return Err(CheckoutError::StockConflict { product_id: item.product_id });
            }
        }
        if let Some(cart_id) = paid.cart_id {
            carts::deactivate_cart(cart_id, &mut tx).await?;
        }
        tx.commit().await?;
        info!("🔄️ Payment for order {order_id} (gateway order {gateway_order_id}) confirmed");
        Ok((paid, true))
    }
}

impl OrderManagement for SqliteDatabase {
    async fn fetch_order_by_id(&self, order_id: i64) -> Result<Option<Order>, OrderLifecycleError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_id(order_id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_timeline(&self, order_id: i64) -> Result<Vec<TimelineEntry>, OrderLifecycleError> {
        let mut conn = self.pool.acquire().await?;
        let timeline = orders::fetch_timeline(order_id, &mut conn).await?;
        Ok(timeline)
    }

    async fn transition_status(
        &self,
        order_id: i64,
        from: OrderStatus,
        to: OrderStatus,
        note: &str,
    ) -> Result<Order, OrderLifecycleError> {
        if !from.can_transition_to(to) {
            return Err(OrderLifecycleError::InvalidTransition { from, to });
        }
        let mut tx = self.pool.begin().await?;
        let updated = orders::update_status_checked(order_id, from, to, &mut tx).await?;
        let order = match updated {
            Some(order) => order,
            None => {
                return match orders::fetch_order_by_id(order_id, &mut tx).await? {
                    Some(_) => Err(OrderLifecycleError::TransitionConflict { expected: from }),
                    None => Err(OrderLifecycleError::OrderNotFound(order_id)),
                };
            },
        };
        orders::append_timeline(order_id, to, note, &mut tx).await?;
        tx.commit().await?;
        info!("📝️ Order {order_id} moved from {from} to {to}");
        Ok(order)
    }

    async fn record_cancellation_request(
        &self,
        order_id: i64,
        owner: &Owner,
        reason: &str,
    ) -> Result<Order, OrderLifecycleError> {
        let mut tx = self.pool.begin().await?;
        let updated = orders::record_cancellation_request(order_id, owner, reason, &mut tx).await?;
        let order = match updated {
            Some(order) => order,
            None => return Err(cancellation_refusal(order_id, owner, &mut tx).await?),
        };
        orders::append_timeline(order_id, order.status, &format!("Cancellation requested: {reason}"), &mut tx).await?;
        tx.commit().await?;
        Ok(order)
    }

    async fn approve_cancellation(&self, order_id: i64) -> Result<Order, OrderLifecycleError> {
        let mut tx = self.pool.begin().await?;
        let updated = orders::approve_cancellation(order_id, &mut tx).await?;
        let order = match updated {
            Some(order) => order,
            None => {
                let order = orders::fetch_order_by_id(order_id, &mut tx)
                    .await?
                    .ok_or(OrderLifecycleError::OrderNotFound(order_id))?;
                let reason = if order.cancel_requested_at.is_none() {
                    "no cancellation has been requested".to_string()
                } else if order.cancellation_approved {
                    "the cancellation has already been approved".to_string()
                } else {
                    format!("the order has already moved to {}", order.status)
                };
                tx.rollback().await?;
                return Err(OrderLifecycleError::CancellationNotAllowed(reason));
            },
        };
        orders::append_timeline(order_id, OrderStatus::Cancelled, "Cancellation approved", &mut tx).await?;
        tx.commit().await?;
        info!("📝️ Cancellation of order {order_id} approved");
        Ok(order)
    }

    async fn record_refund(&self, order_id: i64, amount: Money) -> Result<Order, OrderLifecycleError> {
        if !amount.is_positive() {
            return Err(OrderLifecycleError::InvalidRefundAmount);
        }
        let mut tx = self.pool.begin().await?;
        let order =
            orders::fetch_order_by_id(order_id, &mut tx).await?.ok_or(OrderLifecycleError::OrderNotFound(order_id))?;
        let refundable = matches!(
            order.status,
            OrderStatus::Delivered | OrderStatus::PartiallyRefunded | OrderStatus::Cancelled
        );
        if !refundable {
            tx.rollback().await?;
            return Err(OrderLifecycleError::RefundNotAllowed);
        }
        let remaining = order.total.saturating_sub(order.refunded_total);
        if amount > remaining {
            tx.rollback().await?;
            return Err(OrderLifecycleError::ExcessiveRefund { requested: amount, remaining });
        }
        let new_total = order.refunded_total + amount;
        let fully = new_total == order.total;
        // A cancelled order keeps its status; a delivered order moves through the refund states.
        let new_status = if order.status == OrderStatus::Cancelled {
            OrderStatus::Cancelled
        } else if fully {
            OrderStatus::Refunded
        } else {
            OrderStatus::PartiallyRefunded
        };
        let updated =
            orders::apply_refund(order_id, order.refunded_total, new_total, new_status, fully, &mut tx).await?;
        let order = match updated {
            Some(order) => order,
            None => {
                tx.rollback().await?;
                return Err(OrderLifecycleError::TransitionConflict { expected: order.status });
            },
        };
        orders::append_timeline(order_id, new_status, &format!("Refund of {amount} recorded"), &mut tx).await?;
        if fully {
            payments::mark_refunded(&order.payment.gateway_order_id, &mut tx).await?;
        }
        tx.commit().await?;
        info!("📝️ Refund of {amount} recorded against order {order_id}");
        Ok(order)
    }
}

async fn cancellation_refusal(
    order_id: i64,
    owner: &Owner,
    conn: &mut SqliteConnection,
) -> Result<OrderLifecycleError, OrderLifecycleError> {
    let order = match orders::fetch_order_for_owner(order_id, owner, conn).await? {
        Some(order) => order,
        None => return Ok(OrderLifecycleError::OrderNotFound(order_id)),
    };
    let reason = if order.cancellation_approved {
        "the cancellation has already been approved".to_string()
    } else {
        format!("the order has already moved to {}", order.status)
    };
    Ok(OrderLifecycleError::CancellationNotAllowed(reason))
}

impl InventoryManagement for SqliteDatabase {
    async fn fetch_product_record(&self, product_id: i64) -> Result<Option<Product>, InventoryError> {
        let mut conn = self.pool.acquire().await?;
        let product = products::fetch_product_by_id(product_id, &mut conn).await?;
        Ok(product)
    }

    async fn insert_product(&self, product: NewProduct) -> Result<Product, InventoryError> {
        let mut tx = self.pool.begin().await?;
        let product = products::insert_product(product, &mut tx).await?;
        tx.commit().await?;
        Ok(product)
    }

    async fn adjust_stock(&self, product_id: i64, delta: i64) -> Result<Product, InventoryError> {
        let mut tx = self.pool.begin().await?;
        let product = products::adjust_stock(product_id, delta, &mut tx).await?;
        tx.commit().await?;
        Ok(product)
    }
}
