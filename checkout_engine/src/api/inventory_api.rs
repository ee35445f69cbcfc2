use std::fmt::Debug;

use log::info;

use crate::{
    db_types::{NewProduct, Product},
    traits::{InventoryError, InventoryManagement},
};

/// Administrative access to the product catalog and its stock counters. The checkout confirmation path adjusts
/// stock on its own inside the confirmation transaction; this API is for restocks and corrections.
pub struct InventoryApi<B> {
    db: B,
}

impl<B> Debug for InventoryApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "InventoryApi")
    }
}

impl<B> InventoryApi<B>
where B: InventoryManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub async fn product(&self, product_id: i64) -> Result<Option<Product>, InventoryError> {
        self.db.fetch_product_record(product_id).await
    }

    pub async fn add_product(&self, product: NewProduct) -> Result<Product, InventoryError> {
        let product = self.db.insert_product(product).await?;
        info!("🏷️ Product \"{}\" added to the catalog with id {}", product.title, product.id);
        Ok(product)
    }

    /// Adjusts stock by `delta`. Negative adjustments are refused rather than clamped when they would drive
    /// stock below zero.
    pub async fn adjust_stock(&self, product_id: i64, delta: i64) -> Result<Product, InventoryError> {
        let product = self.db.adjust_stock(product_id, delta).await?;
        info!("🏷️ Stock for product {product_id} adjusted by {delta} to {}", product.stock);
        Ok(product)
    }
}
