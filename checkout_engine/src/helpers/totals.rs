//! Cart and order totals.
//!
//! Totals are always derived server-side, never accepted from the client:
//!
//! ```text
//!     subtotal = Σ(effective unit price × quantity)
//!     discount = Σ coupon effects, computed against the subtotal, clamped to the subtotal
//!     tax      = round((subtotal − discount) × tax rate)
//!     total    = subtotal − discount + tax + shipping cost
//! ```
//!
//! Percentage coupons are computed against the full subtotal, not against the running discounted amount, so a
//! 10%-off coupon and a flat 20-off coupon on a 200.00 cart give a 40.00 discount.

use shop_common::Money;

use crate::db_types::{CartItem, Coupon, DiscountKind, ShippingMethod};

/// Deployment-wide pricing parameters. The tax rate is fixed per deployment region, as is the currency; shipping
/// costs are flat rates per method.
#[derive(Debug, Clone)]
pub struct PricingConfig {
    /// Tax rate in basis points (1000 = 10%).
    pub tax_rate_bp: u32,
    /// ISO-4217 code of the deployment currency.
    pub currency: String,
    pub standard_shipping: Money,
    pub express_shipping: Money,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            tax_rate_bp: 1_000,
            currency: shop_common::DEFAULT_CURRENCY_CODE.to_string(),
            standard_shipping: Money::from(0),
            express_shipping: Money::from(1_500),
        }
    }
}

impl PricingConfig {
    pub fn shipping_cost(&self, method: ShippingMethod) -> Money {
        match method {
            ShippingMethod::Standard => self.standard_shipping,
            ShippingMethod::Express => self.express_shipping,
            ShippingMethod::Pickup => Money::from(0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartTotals {
    pub subtotal: Money,
    pub discount: Money,
    pub tax: Money,
    pub shipping_cost: Money,
    pub total: Money,
}

impl CartTotals {
    pub fn compute(items: &[CartItem], coupons: &[Coupon], shipping_cost: Money, tax_rate_bp: u32) -> Self {
        let subtotal: Money = items.iter().map(CartItem::line_total).sum();
        let raw_discount: Money = coupons.iter().map(|c| coupon_discount(c.kind, c.value, subtotal)).sum();
        let discount = if raw_discount > subtotal { subtotal } else { raw_discount };
        let tax = (subtotal - discount).scale_bp(tax_rate_bp);
        let total = subtotal - discount + tax + shipping_cost;
        Self { subtotal, discount, tax, shipping_cost, total }
    }
}

fn coupon_discount(kind: DiscountKind, value: i64, subtotal: Money) -> Money {
    match kind {
        DiscountKind::Percent => {
            #[allow(clippy::cast_sign_loss)]
            let bp = (value.clamp(0, 100) as u32) * 100;
            subtotal.scale_bp(bp)
        },
        DiscountKind::Fixed => Money::from(value.max(0)),
    }
}

#[cfg(test)]
mod test {
    use chrono::Utc;

    use super::*;

    fn item(product_id: i64, price: i64, qty: i64) -> CartItem {
        CartItem {
            id: product_id,
            cart_id: 1,
            product_id,
            title: format!("Product {product_id}"),
            unit_price: Money::from(price),
            discounted_price: Money::from(price),
            quantity: qty,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn coupon(code: &str, kind: DiscountKind, value: i64) -> Coupon {
        Coupon { id: 0, cart_id: 1, code: code.to_string(), kind, value, created_at: Utc::now() }
    }

    #[test]
    fn empty_cart_totals_are_zero() {
        let t = CartTotals::compute(&[], &[], Money::from(0), 1_000);
        assert_eq!(t.subtotal, Money::from(0));
        assert_eq!(t.discount, Money::from(0));
        assert_eq!(t.tax, Money::from(0));
        assert_eq!(t.total, Money::from(0));
    }

    #[test]
    fn single_line_with_tax() {
        // price 100.00 x 2, no coupon, 10% tax -> subtotal 200, discount 0, tax 20, total 220
        let items = vec![item(1, 10_000, 2)];
        let t = CartTotals::compute(&items, &[], Money::from(0), 1_000);
        assert_eq!(t.subtotal, Money::from(20_000));
        assert_eq!(t.discount, Money::from(0));
        assert_eq!(t.tax, Money::from(2_000));
        assert_eq!(t.total, Money::from(22_000));
    }

    #[test]
    fn stacked_coupons_apply_to_subtotal() {
        // 200.00 subtotal, 10%-off plus flat 20.00-off -> discount 40, tax (200-40)*10% = 16, total 176
        let items = vec![item(1, 10_000, 2)];
        let coupons = vec![coupon("TEN", DiscountKind::Percent, 10), coupon("FLAT20", DiscountKind::Fixed, 2_000)];
        let t = CartTotals::compute(&items, &coupons, Money::from(0), 1_000);
        assert_eq!(t.discount, Money::from(4_000));
        assert_eq!(t.tax, Money::from(1_600));
        assert_eq!(t.total, Money::from(17_600));
    }

    #[test]
    fn discount_is_clamped_to_subtotal() {
        let items = vec![item(1, 500, 1)];
        let coupons = vec![coupon("BIG", DiscountKind::Fixed, 10_000)];
        let t = CartTotals::compute(&items, &coupons, Money::from(0), 1_000);
        assert_eq!(t.discount, Money::from(500));
        assert_eq!(t.tax, Money::from(0));
        assert_eq!(t.total, Money::from(0));
    }

    #[test]
    fn shipping_is_added_after_tax() {
        let items = vec![item(1, 10_000, 1)];
        let t = CartTotals::compute(&items, &[], Money::from(1_500), 1_000);
        assert_eq!(t.total, Money::from(10_000 + 1_000 + 1_500));
    }

    #[test]
    fn invariant_holds_for_a_spread_of_carts() {
        let carts = vec![
            vec![item(1, 999, 3), item(2, 125, 7)],
            vec![item(1, 1, 1)],
            vec![item(1, 49_999, 2), item(2, 10, 100), item(3, 333, 3)],
        ];
        let coupon_sets = vec![
            vec![],
            vec![coupon("A", DiscountKind::Percent, 15)],
            vec![coupon("A", DiscountKind::Percent, 7), coupon("B", DiscountKind::Fixed, 150)],
        ];
        for items in &carts {
            for coupons in &coupon_sets {
                for shipping in [0, 500] {
                    let t = CartTotals::compute(items, coupons, Money::from(shipping), 1_500);
                    assert_eq!(t.total, t.subtotal - t.discount + t.tax + t.shipping_cost);
                    assert_eq!(t.tax, (t.subtotal - t.discount).scale_bp(1_500));
                    assert!(t.discount <= t.subtotal);
                }
            }
        }
    }
}
