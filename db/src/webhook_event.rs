use common::error::{AppError, Res};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

/// Records a gateway notification in the idempotency ledger.
/// Returns `false` when the same event key was already recorded.
pub async fn record_webhook_event<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    event_key: &str,
    payment_id: Option<Uuid>,
    payment_status: &str,
) -> Res<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO webhook_events (event_key, payment_id, payment_status)
        VALUES ($1, $2, $3)
        ON CONFLICT (event_key) DO NOTHING
        "#,
    )
    .bind(event_key)
    .bind(payment_id)
    .bind(payment_status)
    .execute(executor)
    .await
    .map_err(AppError::from)?;

    Ok(result.rows_affected() == 1)
}
