use std::fmt::Debug;

use chrono::Utc;

use crate::{
    db_types::{Cart, NewCoupon, Owner, ShippingMethod},
    helpers::PricingConfig,
    traits::{CartError, CartManagement},
};

/// The `CartApi` is the single mutation surface for pre-purchase carts. Totals are derived inside the storage
/// layer on every mutation, so callers always get back a fully repriced cart.
pub struct CartApi<B> {
    db: B,
    pricing: PricingConfig,
}

impl<B> Debug for CartApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CartApi")
    }
}

impl<B> CartApi<B>
where B: CartManagement
{
    pub fn new(db: B, pricing: PricingConfig) -> Self {
        Self { db, pricing }
    }

    pub fn pricing(&self) -> &PricingConfig {
        &self.pricing
    }

    /// Fetches the owner's active cart, if any.
    pub async fn cart(&self, owner: &Owner) -> Result<Option<Cart>, CartError> {
        self.db.fetch_active_cart(owner).await
    }

    /// Adds `quantity` units of a product to the owner's cart, creating the cart on first use. Quantities for a
    /// product already in the cart merge.
    pub async fn add_item(&self, owner: &Owner, product_id: i64, quantity: i64) -> Result<Cart, CartError> {
        self.db.add_item(owner, product_id, quantity, &self.pricing).await
    }

    pub async fn update_item_quantity(
        &self,
        owner: &Owner,
        product_id: i64,
        quantity: i64,
    ) -> Result<Cart, CartError> {
        self.db.update_item_quantity(owner, product_id, quantity, &self.pricing).await
    }

    pub async fn remove_item(&self, owner: &Owner, product_id: i64) -> Result<Cart, CartError> {
        self.db.remove_item(owner, product_id, &self.pricing).await
    }

    pub async fn clear(&self, owner: &Owner) -> Result<Cart, CartError> {
        self.db.clear_cart(owner, &self.pricing).await
    }

    pub async fn apply_coupon(&self, owner: &Owner, coupon: NewCoupon) -> Result<Cart, CartError> {
        self.db.apply_coupon(owner, coupon, &self.pricing).await
    }

    pub async fn remove_coupon(&self, owner: &Owner, code: &str) -> Result<Cart, CartError> {
        self.db.remove_coupon(owner, code, &self.pricing).await
    }

    pub async fn set_shipping(&self, owner: &Owner, method: ShippingMethod) -> Result<Cart, CartError> {
        self.db.set_shipping(owner, method, &self.pricing).await
    }

    /// Deactivates every active cart whose expiry window has lapsed. Returns the number of carts reclaimed.
    pub async fn expire_stale_carts(&self) -> Result<u64, CartError> {
        self.db.expire_stale_carts(Utc::now()).await
    }
}
