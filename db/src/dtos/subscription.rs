use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::models::status::Period;

pub struct SubscriptionCreateRequest {
    pub user_id: Uuid,
    pub pair_id: Uuid,
    pub period: Period,
    pub start_date: NaiveDateTime,
    pub base_price_cents: i64,
    pub discount_rate: f64,
}
