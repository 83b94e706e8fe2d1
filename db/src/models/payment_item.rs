use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct PaymentItem {
    pub id: Uuid,
    pub payment_id: Uuid,
    pub pair_id: Uuid,
    pub subscription_id: Uuid,
    pub base_price_cents: i64,
    pub discount_rate: f64,
    pub final_price_cents: i64,
}
