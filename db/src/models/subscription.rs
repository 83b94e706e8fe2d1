use chrono::NaiveDateTime;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub pair_id: Uuid,
    pub period: String,
    pub start_date: NaiveDateTime,
    pub expiry_date: NaiveDateTime,
    pub status: String,
    pub invite_status: String,
    pub base_price_cents: i64,
    pub discount_rate: f64,
    pub payment_id: Option<Uuid>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}
