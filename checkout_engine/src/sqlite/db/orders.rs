use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{GatewayOrderId, NewOrder, Order, OrderItem, OrderStatus, Owner, TimelineEntry},
    traits::PaymentConfirmation,
};
use shop_common::Money;

/// Inserts the order header, its lines, and the opening timeline entry. Not atomic on its own; callers wrap it in
/// a transaction and pass `&mut *tx` as the connection argument.
pub async fn insert_full_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, sqlx::Error> {
    let billing = serde_json::to_string(&order.billing_address)
        .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
    let shipping = serde_json::to_string(&order.shipping_address)
        .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
    let mut header: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                owner_kind,
                owner_id,
                cart_id,
                customer_name,
                customer_email,
                billing_address,
                shipping_address,
                notes,
                subtotal,
                discount,
                tax,
                shipping_cost,
                total,
                currency,
                gateway,
                gateway_order_id
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING *;
        "#,
    )
    .bind(order.owner.kind.to_string())
    .bind(order.owner.id)
    .bind(order.cart_id)
    .bind(order.customer_name)
    .bind(order.customer_email)
    .bind(billing)
    .bind(shipping)
    .bind(order.notes)
    .bind(order.subtotal)
    .bind(order.discount)
    .bind(order.tax)
    .bind(order.shipping_cost)
    .bind(order.total)
    .bind(order.currency)
    .bind(order.gateway)
    .bind(order.gateway_order_id)
    .fetch_one(&mut *conn)
    .await?;
    for item in order.items {
        sqlx::query(
            r#"
                INSERT INTO order_items (order_id, product_id, title, unit_price, discounted_price, quantity, line_total)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(header.id)
        .bind(item.product_id)
        .bind(item.title.as_str())
        .bind(item.unit_price)
        .bind(item.discounted_price)
        .bind(item.quantity)
        .bind(item.line_total())
        .execute(&mut *conn)
        .await?;
    }
    append_timeline(header.id, OrderStatus::Pending, "Order created", &mut *conn).await?;
    header.items = fetch_order_items(header.id, conn).await?;
    debug!("📝️ Order {} created for gateway order {}", header.id, header.payment.gateway_order_id);
    Ok(header)
}

pub async fn fetch_order_items(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<OrderItem>, sqlx::Error> {
    let items = sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(items)
}

async fn with_items(order: Option<Order>, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    match order {
        Some(mut order) => {
            order.items = fetch_order_items(order.id, conn).await?;
            Ok(Some(order))
        },
        None => Ok(None),
    }
}

pub async fn fetch_order_by_id(order_id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order: Option<Order> =
        sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(order_id).fetch_optional(&mut *conn).await?;
    with_items(order, conn).await
}

pub async fn fetch_order_for_owner(
    order_id: i64,
    owner: &Owner,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order: Option<Order> =
        sqlx::query_as("SELECT * FROM orders WHERE id = $1 AND owner_kind = $2 AND owner_id = $3")
            .bind(order_id)
            .bind(owner.kind.to_string())
            .bind(owner.id.as_str())
            .fetch_optional(&mut *conn)
            .await?;
    with_items(order, conn).await
}

/// Fetches the order matching the full (id, owner, gateway order id) triple. Verification never acts on anything
/// weaker than this match.
pub async fn fetch_order_for_verification(
    order_id: i64,
    owner: &Owner,
    gateway_order_id: &GatewayOrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order: Option<Order> = sqlx::query_as(
        "SELECT * FROM orders WHERE id = $1 AND owner_kind = $2 AND owner_id = $3 AND gateway_order_id = $4",
    )
    .bind(order_id)
    .bind(owner.kind.to_string())
    .bind(owner.id.as_str())
    .bind(gateway_order_id.as_str())
    .fetch_optional(&mut *conn)
    .await?;
    with_items(order, conn).await
}

pub async fn append_timeline(
    order_id: i64,
    status: OrderStatus,
    note: &str,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO order_timeline (order_id, status, note) VALUES ($1, $2, $3)")
        .bind(order_id)
        .bind(status.to_string())
        .bind(note)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn fetch_timeline(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<TimelineEntry>, sqlx::Error> {
    let entries = sqlx::query_as("SELECT * FROM order_timeline WHERE order_id = $1 ORDER BY id")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(entries)
}

/// Records the confirmed payment onto the order and promotes it to `Confirmed`. The `payment_status = 'Pending'`
/// predicate makes the write idempotent: a replayed confirmation matches zero rows and returns `None`.
pub async fn mark_paid(
    order_id: i64,
    confirmation: &PaymentConfirmation,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order: Option<Order> = sqlx::query_as(
        r#"
            UPDATE orders SET
                payment_status = 'Paid',
                paid_at = CURRENT_TIMESTAMP,
                gateway_payment_id = $1,
                payment_signature = $2,
                status = 'Confirmed',
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $3 AND payment_status = 'Pending'
            RETURNING *;
        "#,
    )
    .bind(confirmation.gateway_payment_id.as_str())
    .bind(confirmation.signature.as_str())
    .bind(order_id)
    .fetch_optional(&mut *conn)
    .await?;
    with_items(order, conn).await
}

/// Moves the order from `from` to `to`, stamping the shipped/delivered timestamps where applicable. The expected
/// current status is part of the predicate; a concurrent transition matches zero rows and returns `None`.
pub async fn update_status_checked(
    order_id: i64,
    from: OrderStatus,
    to: OrderStatus,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order: Option<Order> = sqlx::query_as(
        r#"
            UPDATE orders SET
                status = $1,
                shipped_at = CASE WHEN $1 = 'Shipped' THEN CURRENT_TIMESTAMP ELSE shipped_at END,
                delivered_at = CASE WHEN $1 = 'Delivered' THEN CURRENT_TIMESTAMP ELSE delivered_at END,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $2 AND status = $3
            RETURNING *;
        "#,
    )
    .bind(to.to_string())
    .bind(order_id)
    .bind(from.to_string())
    .fetch_optional(&mut *conn)
    .await?;
    with_items(order, conn).await
}

/// Records a cancellation request. The predicate restricts the write to cancellable, not-yet-approved orders
/// belonging to the owner, so the request and a concurrent shipment serialize cleanly.
pub async fn record_cancellation_request(
    order_id: i64,
    owner: &Owner,
    reason: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order: Option<Order> = sqlx::query_as(
        r#"
            UPDATE orders SET
                cancel_reason = $1,
                cancel_requested_at = CURRENT_TIMESTAMP,
                refund_status = 'Pending',
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $2 AND owner_kind = $3 AND owner_id = $4
              AND status IN ('Pending', 'Confirmed') AND cancellation_approved = 0
            RETURNING *;
        "#,
    )
    .bind(reason)
    .bind(order_id)
    .bind(owner.kind.to_string())
    .bind(owner.id.as_str())
    .fetch_optional(&mut *conn)
    .await?;
    with_items(order, conn).await
}

pub async fn approve_cancellation(order_id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order: Option<Order> = sqlx::query_as(
        r#"
            UPDATE orders SET
                cancellation_approved = 1,
                status = 'Cancelled',
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $1 AND cancel_requested_at IS NOT NULL
              AND status IN ('Pending', 'Confirmed') AND cancellation_approved = 0
            RETURNING *;
        "#,
    )
    .bind(order_id)
    .fetch_optional(&mut *conn)
    .await?;
    with_items(order, conn).await
}

/// Applies an accumulated refund. The previous refunded total is part of the predicate, so two concurrent refunds
/// against the same order serialize to one application and one conflict.
pub async fn apply_refund(
    order_id: i64,
    expected_refunded_total: Money,
    new_refunded_total: Money,
    new_status: OrderStatus,
    fully_refunded: bool,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let refund_status = if fully_refunded { "Completed" } else { "Partial" };
    let order: Option<Order> = sqlx::query_as(
        r#"
            UPDATE orders SET
                refunded_total = $1,
                refund_status = $2,
                status = $3,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $4 AND refunded_total = $5
            RETURNING *;
        "#,
    )
    .bind(new_refunded_total)
    .bind(refund_status)
    .bind(new_status.to_string())
    .bind(order_id)
    .bind(expected_refunded_total)
    .fetch_optional(&mut *conn)
    .await?;
    with_items(order, conn).await
}
