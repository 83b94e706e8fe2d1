use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::types::JsonValue;
use uuid::Uuid;

use crate::models::status::PaymentStatus;

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Payment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub total_amount_cents: i64,
    pub network: String,
    pub status: String,
    pub order_id: String,
    pub invoice_id: Option<String>,
    pub invoice_url: Option<String>,
    pub payment_id: Option<String>,
    pub tx_hash: Option<String>,
    pub actually_paid: Option<f64>,
    pub expires_at: NaiveDateTime,
    pub order_data: JsonValue,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Payment {
    /// Parsed status. Rows written by older code with unknown values read as PENDING.
    pub fn status(&self) -> PaymentStatus {
        self.status.parse().unwrap_or(PaymentStatus::Pending)
    }
}
