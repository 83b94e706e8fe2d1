use uuid::Uuid;

pub struct PaymentItemCreateRequest {
    pub payment_id: Uuid,
    pub pair_id: Uuid,
    pub subscription_id: Uuid,
    pub base_price_cents: i64,
    pub discount_rate: f64,
    pub final_price_cents: i64,
}
