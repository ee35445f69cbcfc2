use chrono::{DateTime, Utc};
use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{Cart, CartItem, Coupon, NewCoupon, Owner, Product, ShippingMethod},
    helpers::CartTotals,
};
use shop_common::Money;

/// Fetches the owner's active cart row, if any, with its items and coupons populated.
pub async fn fetch_active_cart(owner: &Owner, conn: &mut SqliteConnection) -> Result<Option<Cart>, sqlx::Error> {
    let cart: Option<Cart> =
        sqlx::query_as("SELECT * FROM carts WHERE owner_kind = $1 AND owner_id = $2 AND is_active = 1")
            .bind(owner.kind.to_string())
            .bind(owner.id.as_str())
            .fetch_optional(&mut *conn)
            .await?;
    match cart {
        Some(cart) => Ok(Some(load_cart_details(cart, conn).await?)),
        None => Ok(None),
    }
}

/// Fetches the owner's active cart, creating an empty one when none exists. The partial unique index on
/// `(owner_kind, owner_id)` makes a concurrent double-create fail loudly rather than silently fork the cart.
pub async fn fetch_or_create_active_cart(owner: &Owner, conn: &mut SqliteConnection) -> Result<Cart, sqlx::Error> {
    if let Some(cart) = fetch_active_cart(owner, &mut *conn).await? {
        return Ok(cart);
    }
    let cart: Cart = sqlx::query_as(
        "INSERT INTO carts (owner_kind, owner_id, expires_at) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(owner.kind.to_string())
    .bind(owner.id.as_str())
    .bind(Cart::expiry_from(Utc::now()))
    .fetch_one(conn)
    .await?;
    debug!("🗃️ New cart {} created for {owner}", cart.id);
    Ok(cart)
}

pub async fn fetch_cart_by_id(cart_id: i64, conn: &mut SqliteConnection) -> Result<Option<Cart>, sqlx::Error> {
    let cart: Option<Cart> =
        sqlx::query_as("SELECT * FROM carts WHERE id = $1").bind(cart_id).fetch_optional(&mut *conn).await?;
    match cart {
        Some(cart) => Ok(Some(load_cart_details(cart, conn).await?)),
        None => Ok(None),
    }
}

async fn load_cart_details(mut cart: Cart, conn: &mut SqliteConnection) -> Result<Cart, sqlx::Error> {
    cart.items = sqlx::query_as::<_, CartItem>("SELECT * FROM cart_items WHERE cart_id = $1 ORDER BY id")
        .bind(cart.id)
        .fetch_all(&mut *conn)
        .await?;
    cart.coupons = sqlx::query_as::<_, Coupon>("SELECT * FROM cart_coupons WHERE cart_id = $1 ORDER BY id")
        .bind(cart.id)
        .fetch_all(conn)
        .await?;
    Ok(cart)
}

/// Writes a cart line with the given absolute quantity, snapshotting the product's title and current prices.
/// An existing line for the same product is replaced, including its price snapshot.
pub async fn upsert_item(
    cart_id: i64,
    product: &Product,
    effective_price: Money,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
            INSERT INTO cart_items (cart_id, product_id, title, unit_price, discounted_price, quantity)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (cart_id, product_id) DO UPDATE SET
                title = excluded.title,
                unit_price = excluded.unit_price,
                discounted_price = excluded.discounted_price,
                quantity = excluded.quantity,
                updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(cart_id)
    .bind(product.id)
    .bind(product.title.as_str())
    .bind(product.price)
    .bind(effective_price)
    .bind(quantity)
    .execute(conn)
    .await?;
    Ok(())
}

/// Deletes a line. Returns the number of rows removed so callers can report a missing line.
pub async fn delete_item(cart_id: i64, product_id: i64, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM cart_items WHERE cart_id = $1 AND product_id = $2")
        .bind(cart_id)
        .bind(product_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}

pub async fn clear_items(cart_id: i64, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM cart_items WHERE cart_id = $1").bind(cart_id).execute(conn).await?;
    Ok(())
}

pub async fn clear_coupons(cart_id: i64, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM cart_coupons WHERE cart_id = $1").bind(cart_id).execute(conn).await?;
    Ok(())
}

/// Stores a coupon. Reapplying the same code replaces the stored kind and value, so the operation is idempotent
/// per code.
pub async fn upsert_coupon(cart_id: i64, coupon: NewCoupon, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
            INSERT INTO cart_coupons (cart_id, code, kind, value) VALUES ($1, $2, $3, $4)
            ON CONFLICT (cart_id, code) DO UPDATE SET kind = excluded.kind, value = excluded.value
        "#,
    )
    .bind(cart_id)
    .bind(coupon.code)
    .bind(coupon.kind.to_string())
    .bind(coupon.value)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn delete_coupon(cart_id: i64, code: &str, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM cart_coupons WHERE cart_id = $1 AND code = $2")
        .bind(cart_id)
        .bind(code)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}

pub async fn set_shipping(
    cart_id: i64,
    method: ShippingMethod,
    cost: Money,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE carts SET shipping_method = $1, shipping_cost = $2, updated_at = CURRENT_TIMESTAMP WHERE id = $3")
        .bind(method.to_string())
        .bind(cost)
        .bind(cart_id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Writes the freshly derived totals back onto the cart row. Any mutation counts as activity, so the expiry
/// window is renewed at the same time.
pub async fn update_totals(cart_id: i64, totals: &CartTotals, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
            UPDATE carts SET
                subtotal = $1,
                discount = $2,
                tax = $3,
                shipping_cost = $4,
                total = $5,
                expires_at = $6,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $7
        "#,
    )
    .bind(totals.subtotal)
    .bind(totals.discount)
    .bind(totals.tax)
    .bind(totals.shipping_cost)
    .bind(totals.total)
    .bind(Cart::expiry_from(Utc::now()))
    .bind(cart_id)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn deactivate_cart(cart_id: i64, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE carts SET is_active = 0, updated_at = CURRENT_TIMESTAMP WHERE id = $1")
        .bind(cart_id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Deactivates active carts whose expiry timestamp has passed the cutoff. Returns the number of carts reclaimed.
pub async fn expire_stale(cutoff: DateTime<Utc>, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result =
        sqlx::query("UPDATE carts SET is_active = 0, updated_at = CURRENT_TIMESTAMP WHERE is_active = 1 AND expires_at < $1")
            .bind(cutoff)
            .execute(conn)
            .await?;
    Ok(result.rows_affected())
}
