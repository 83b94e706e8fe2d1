use common::error::{AppError, Res};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    dtos::payment::{PaymentCreateRequest, PaymentStatusUpdate},
    models::payment::Payment,
};

pub async fn insert_payment<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    data: PaymentCreateRequest,
) -> Res<Payment> {
    sqlx::query_as::<_, Payment>(
        r#"
        INSERT INTO payments (user_id, total_amount_cents, network, status, order_id, invoice_id, invoice_url, expires_at, order_data)
        VALUES ($1, $2, $3, 'PENDING', $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(data.user_id)
    .bind(data.total_amount_cents)
    .bind(data.network)
    .bind(data.order_id)
    .bind(data.invoice_id)
    .bind(data.invoice_url)
    .bind(data.expires_at)
    .bind(data.order_data)
    .fetch_one(executor)
    .await
    .map_err(AppError::from)
}

/// Loads a payment by its correlation id and locks the row until the
/// surrounding transaction ends.
pub async fn get_payment_by_order_id_for_update<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    order_id: &str,
) -> Res<Option<Payment>> {
    sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE order_id = $1 FOR UPDATE")
        .bind(order_id)
        .fetch_optional(executor)
        .await
        .map_err(AppError::from)
}

pub async fn get_payment_by_id_for_update<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    id: Uuid,
) -> Res<Payment> {
    sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_one(executor)
        .await
        .map_err(AppError::from)
}

pub async fn get_user_payment_by_invoice_id<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    invoice_id: &str,
    user_id: Uuid,
) -> Res<Option<Payment>> {
    sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE invoice_id = $1 AND user_id = $2")
        .bind(invoice_id)
        .bind(user_id)
        .fetch_optional(executor)
        .await
        .map_err(AppError::from)
}

pub async fn get_payments_by_user_id<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
) -> Res<Vec<Payment>> {
    sqlx::query_as::<_, Payment>(
        "SELECT * FROM payments WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(executor)
    .await
    .map_err(AppError::from)
}

pub async fn update_payment_status<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    id: Uuid,
    data: PaymentStatusUpdate,
) -> Res<Payment> {
    sqlx::query_as::<_, Payment>(
        r#"
        UPDATE payments
        SET status = $1,
            payment_id = COALESCE($2, payment_id),
            tx_hash = COALESCE($3, tx_hash),
            actually_paid = COALESCE($4, actually_paid),
            updated_at = NOW()
        WHERE id = $5
        RETURNING *
        "#,
    )
    .bind(data.status.as_str())
    .bind(data.payment_id)
    .bind(data.tx_hash)
    .bind(data.actually_paid)
    .bind(id)
    .fetch_one(executor)
    .await
    .map_err(AppError::from)
}

/// Stores the gateway's payment references without touching the status.
/// `None` keeps the stored value.
pub async fn update_payment_gateway_refs<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    id: Uuid,
    payment_id: Option<&str>,
    tx_hash: Option<&str>,
    actually_paid: Option<f64>,
) -> Res<Payment> {
    sqlx::query_as::<_, Payment>(
        r#"
        UPDATE payments
        SET payment_id = COALESCE($1, payment_id),
            tx_hash = COALESCE($2, tx_hash),
            actually_paid = COALESCE($3, actually_paid),
            updated_at = NOW()
        WHERE id = $4
        RETURNING *
        "#,
    )
    .bind(payment_id)
    .bind(tx_hash)
    .bind(actually_paid)
    .bind(id)
    .fetch_one(executor)
    .await
    .map_err(AppError::from)
}
