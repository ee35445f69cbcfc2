use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{
    db_types::{Cart, NewCoupon, Owner, ShippingMethod},
    helpers::PricingConfig,
};

/// Storage contract for cart state.
///
/// Every mutation is a single atomic operation that validates the target product against its *current* record,
/// snapshots display fields and prices, and recomputes the derived totals before persisting. Totals are never
/// client-supplied.
#[allow(async_fn_in_trait)]
pub trait CartManagement: Clone {
    /// Fetches the owner's active cart, with line items and coupons populated.
    async fn fetch_active_cart(&self, owner: &Owner) -> Result<Option<Cart>, CartError>;

    /// Adds `quantity` units of the product to the owner's active cart, creating the cart if this is the owner's
    /// first add. If the product is already in the cart, the quantities merge, and the stock check runs against
    /// the merged quantity.
    async fn add_item(
        &self,
        owner: &Owner,
        product_id: i64,
        quantity: i64,
        pricing: &PricingConfig,
    ) -> Result<Cart, CartError>;

    /// Replaces the quantity of an existing line. The product must still be available and sufficiently stocked
    /// for the new quantity.
    async fn update_item_quantity(
        &self,
        owner: &Owner,
        product_id: i64,
        quantity: i64,
        pricing: &PricingConfig,
    ) -> Result<Cart, CartError>;

    /// Removes a line from the cart.
    async fn remove_item(&self, owner: &Owner, product_id: i64, pricing: &PricingConfig) -> Result<Cart, CartError>;

    /// Removes every line and coupon from the cart.
    async fn clear_cart(&self, owner: &Owner, pricing: &PricingConfig) -> Result<Cart, CartError>;

    /// Applies a coupon to the cart. Idempotent per code: reapplying a code replaces the stored entry rather than
    /// duplicating it. Rejected when the cart is empty.
    async fn apply_coupon(&self, owner: &Owner, coupon: NewCoupon, pricing: &PricingConfig)
        -> Result<Cart, CartError>;

    /// Removes a coupon by code.
    async fn remove_coupon(&self, owner: &Owner, code: &str, pricing: &PricingConfig) -> Result<Cart, CartError>;

    /// Selects the shipping method and reprices the cart with its flat-rate cost.
    async fn set_shipping(
        &self,
        owner: &Owner,
        method: ShippingMethod,
        pricing: &PricingConfig,
    ) -> Result<Cart, CartError>;

    /// Deactivates carts that have seen no activity since before `cutoff`. Returns the number of carts reclaimed.
    async fn expire_stale_carts(&self, cutoff: DateTime<Utc>) -> Result<u64, CartError>;
}

#[derive(Debug, Clone, Error)]
pub enum CartError {
    #[error("We have an internal database engine error: {0}")]
    DatabaseError(String),
    #[error("Product {0} does not exist")]
    ProductNotFound(i64),
    #[error("Product {0} is not available for purchase")]
    ProductUnavailable(i64),
    #[error("Insufficient stock: {available} units available, {requested} requested")]
    InsufficientStock { requested: i64, available: i64 },
    #[error("Product {0} is not in the cart")]
    ItemNotInCart(i64),
    #[error("No active cart exists for this owner")]
    CartNotFound,
    #[error("The cart is empty")]
    EmptyCart,
    #[error("Quantity must be at least 1")]
    InvalidQuantity,
}

impl From<sqlx::Error> for CartError {
    fn from(e: sqlx::Error) -> Self {
        CartError::DatabaseError(e.to_string())
    }
}
