use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewProduct, Product},
    traits::InventoryError,
};

pub async fn insert_product(product: NewProduct, conn: &mut SqliteConnection) -> Result<Product, InventoryError> {
    let product: Product = sqlx::query_as(
        r#"
            INSERT INTO products (
                title,
                price,
                discount_kind,
                discount_value,
                discount_valid_from,
                discount_valid_until,
                stock,
                unlimited
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *;
        "#,
    )
    .bind(product.title)
    .bind(product.price)
    .bind(product.discount_kind.map(|k| k.to_string()))
    .bind(product.discount_value)
    .bind(product.discount_valid_from)
    .bind(product.discount_valid_until)
    .bind(product.stock)
    .bind(product.unlimited)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Product \"{}\" inserted with id {}", product.title, product.id);
    Ok(product)
}

pub async fn fetch_product_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<Product>, sqlx::Error> {
    let product = sqlx::query_as("SELECT * FROM products WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(product)
}

/// Adjusts the stock counter by `delta`. A negative delta is guarded in the SQL predicate, so that a concurrent
/// draw-down can never push stock below zero. Adjusting an unlimited product is a no-op.
pub async fn adjust_stock(id: i64, delta: i64, conn: &mut SqliteConnection) -> Result<Product, InventoryError> {
    let current = fetch_product_by_id(id, &mut *conn).await?.ok_or(InventoryError::ProductNotFound(id))?;
    if current.unlimited {
        return Ok(current);
    }
    let updated: Option<Product> = sqlx::query_as(
        "UPDATE products SET stock = stock + $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 AND stock + $1 >= 0 \
         RETURNING *",
    )
    .bind(delta)
    .bind(id)
    .fetch_optional(conn)
    .await?;
    updated.ok_or(InventoryError::StockUnderflow { requested: -delta, available: current.stock })
}

/// Applies the inventory side of a confirmed sale: sales up by `quantity`, and for finite-stock products, stock
/// down by the same amount. Returns `false` when the guard refused the decrement, in which case the caller must
/// abort its transaction.
pub async fn apply_confirmed_sale(
    product_id: i64,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
            UPDATE products SET
                sales = sales + $1,
                stock = CASE WHEN unlimited THEN stock ELSE stock - $1 END,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $2 AND (unlimited = 1 OR stock >= $1)
        "#,
    )
    .bind(quantity)
    .bind(product_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}
