use common::error::{AppError, Res};
use sqlx::{Executor, Postgres};

use crate::{dtos::payment_item::PaymentItemCreateRequest, models::payment_item::PaymentItem};

pub async fn insert_payment_item<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    data: PaymentItemCreateRequest,
) -> Res<PaymentItem> {
    sqlx::query_as::<_, PaymentItem>(
        r#"
        INSERT INTO payment_items (payment_id, pair_id, subscription_id, base_price_cents, discount_rate, final_price_cents)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(data.payment_id)
    .bind(data.pair_id)
    .bind(data.subscription_id)
    .bind(data.base_price_cents)
    .bind(data.discount_rate)
    .bind(data.final_price_cents)
    .fetch_one(executor)
    .await
    .map_err(AppError::from)
}
