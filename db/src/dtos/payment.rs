use chrono::NaiveDateTime;
use sqlx::types::JsonValue;
use uuid::Uuid;

use crate::models::status::PaymentStatus;

pub struct PaymentCreateRequest {
    pub user_id: Uuid,
    pub total_amount_cents: i64,
    pub network: String,
    pub order_id: String,
    pub invoice_id: String,
    pub invoice_url: String,
    pub expires_at: NaiveDateTime,
    pub order_data: JsonValue,
}

/// Fields written on a status transition. `None` keeps the stored value.
pub struct PaymentStatusUpdate {
    pub status: PaymentStatus,
    pub payment_id: Option<String>,
    pub tx_hash: Option<String>,
    pub actually_paid: Option<f64>,
}
