use chrono::NaiveDateTime;
use common::error::{AppError, Res};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    dtos::subscription::SubscriptionCreateRequest,
    models::{
        status::{InviteStatus, SubscriptionStatus},
        subscription::Subscription,
    },
};

pub async fn insert_subscription<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    data: SubscriptionCreateRequest,
) -> Res<Subscription> {
    let expiry_date = data.period.expiry_from(data.start_date);
    sqlx::query_as::<_, Subscription>(
        r#"
        INSERT INTO subscriptions (user_id, pair_id, period, start_date, expiry_date, status, invite_status, base_price_cents, discount_rate)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(data.user_id)
    .bind(data.pair_id)
    .bind(data.period.as_str())
    .bind(data.start_date)
    .bind(expiry_date)
    .bind(SubscriptionStatus::Pending.as_str())
    .bind(InviteStatus::Pending.as_str())
    .bind(data.base_price_cents)
    .bind(data.discount_rate)
    .fetch_one(executor)
    .await
    .map_err(AppError::from)
}

/// PENDING subscriptions purchased through the given payment.
pub async fn get_pending_subscriptions_by_payment<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    payment_id: Uuid,
) -> Res<Vec<Subscription>> {
    sqlx::query_as::<_, Subscription>(
        r#"
        SELECT s.*
        FROM subscriptions s
        JOIN payment_items pi ON pi.subscription_id = s.id
        WHERE pi.payment_id = $1 AND s.status = 'PENDING'
        "#,
    )
    .bind(payment_id)
    .fetch_all(executor)
    .await
    .map_err(AppError::from)
}

pub async fn activate_subscription<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    subscription_id: Uuid,
    payment_id: Uuid,
    start_date: NaiveDateTime,
    expiry_date: NaiveDateTime,
) -> Res<Subscription> {
    sqlx::query_as::<_, Subscription>(
        r#"
        UPDATE subscriptions
        SET status = $1, payment_id = $2, start_date = $3, expiry_date = $4, updated_at = NOW()
        WHERE id = $5
        RETURNING *
        "#,
    )
    .bind(SubscriptionStatus::Active.as_str())
    .bind(payment_id)
    .bind(start_date)
    .bind(expiry_date)
    .bind(subscription_id)
    .fetch_one(executor)
    .await
    .map_err(AppError::from)
}
