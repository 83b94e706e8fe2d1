use common::error::{AppError, Res};
use sqlx::{Executor, Postgres};

use crate::dtos::payment_event::PaymentEventCreateRequest;

pub async fn insert_payment_event<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    data: PaymentEventCreateRequest<'_>,
) -> Res<()> {
    sqlx::query(
        "INSERT INTO payment_events (payment_id, source, from_status, to_status, gateway_status)
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(data.payment_id)
    .bind(data.source)
    .bind(data.from_status.as_str())
    .bind(data.to_status.as_str())
    .bind(data.gateway_status)
    .execute(executor)
    .await
    .map_err(AppError::from)?;

    Ok(())
}
