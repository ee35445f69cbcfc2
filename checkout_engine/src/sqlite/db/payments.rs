use log::debug;
use sqlx::SqliteConnection;

use crate::db_types::{GatewayOrderId, NewPaymentAudit, PaymentAudit};

pub async fn insert_audit(audit: NewPaymentAudit, conn: &mut SqliteConnection) -> Result<PaymentAudit, sqlx::Error> {
    let audit: PaymentAudit = sqlx::query_as(
        r#"
            INSERT INTO payment_audits (gateway_order_id, gateway, owner_kind, owner_id, amount, currency)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(audit.gateway_order_id)
    .bind(audit.gateway)
    .bind(audit.owner.kind.to_string())
    .bind(audit.owner.id)
    .bind(audit.amount)
    .bind(audit.currency)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Payment audit {} recorded for gateway order {}", audit.id, audit.gateway_order_id);
    Ok(audit)
}

pub async fn fetch_audit_by_gateway_order_id(
    gateway_order_id: &GatewayOrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentAudit>, sqlx::Error> {
    let audit = sqlx::query_as("SELECT * FROM payment_audits WHERE gateway_order_id = $1")
        .bind(gateway_order_id.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(audit)
}

/// Marks the ledger entry `Failed`. Returns the number of rows touched so callers can tell a missing entry from a
/// recorded failure. The status predicate keeps finalized entries immutable: a forged callback arriving after a
/// successful confirmation must not downgrade a `Success` or `Refunded` row.
pub async fn mark_failed(
    gateway_order_id: &GatewayOrderId,
    reason: &str,
    conn: &mut SqliteConnection,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE payment_audits SET status = 'Failed', failure_reason = $1, completed_at = CURRENT_TIMESTAMP, \
         updated_at = CURRENT_TIMESTAMP WHERE gateway_order_id = $2 AND status IN ('Initiated', 'Failed')",
    )
    .bind(reason)
    .bind(gateway_order_id.as_str())
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

pub async fn mark_success(
    gateway_order_id: &GatewayOrderId,
    gateway_payment_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentAudit>, sqlx::Error> {
    let audit = sqlx::query_as(
        "UPDATE payment_audits SET status = 'Success', gateway_payment_id = $1, completed_at = CURRENT_TIMESTAMP, \
         updated_at = CURRENT_TIMESTAMP WHERE gateway_order_id = $2 RETURNING *",
    )
    .bind(gateway_payment_id)
    .bind(gateway_order_id.as_str())
    .fetch_optional(conn)
    .await?;
    Ok(audit)
}

pub async fn mark_refunded(gateway_order_id: &GatewayOrderId, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE payment_audits SET status = 'Refunded', updated_at = CURRENT_TIMESTAMP WHERE gateway_order_id = $1",
    )
    .bind(gateway_order_id.as_str())
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}
