use thiserror::Error;

use crate::db_types::{NewProduct, Product};

/// Storage contract for product stock.
///
/// Together with the confirmation transaction in [`super::CheckoutDatabase::confirm_payment`], this is the only
/// place stock and sales columns are written. Stock moves on confirmed payment, never at add-to-cart or order
/// creation time: reserving at checkout would let abandoned payment attempts starve availability indefinitely.
#[allow(async_fn_in_trait)]
pub trait InventoryManagement: Clone {
    async fn fetch_product_record(&self, product_id: i64) -> Result<Option<Product>, InventoryError>;

    /// Inserts a new catalog entry.
    async fn insert_product(&self, product: NewProduct) -> Result<Product, InventoryError>;

    /// Adjusts stock by `delta` (positive to restock, negative to draw down). A negative adjustment is guarded at
    /// the SQL level and refuses to drive stock below zero. Adjusting an unlimited product is a no-op.
    async fn adjust_stock(&self, product_id: i64, delta: i64) -> Result<Product, InventoryError>;
}

#[derive(Debug, Clone, Error)]
pub enum InventoryError {
    #[error("We have an internal database engine error: {0}")]
    DatabaseError(String),
    #[error("Product {0} does not exist")]
    ProductNotFound(i64),
    #[error("Stock adjustment refused: {available} units available, {requested} requested")]
    StockUnderflow { requested: i64, available: i64 },
}

impl From<sqlx::Error> for InventoryError {
    fn from(e: sqlx::Error) -> Self {
        InventoryError::DatabaseError(e.to_string())
    }
}
