use uuid::Uuid;

use crate::models::status::PaymentStatus;

pub struct PaymentEventCreateRequest<'a> {
    pub payment_id: Uuid,
    pub source: &'a str,
    pub from_status: PaymentStatus,
    pub to_status: PaymentStatus,
    pub gateway_status: Option<&'a str>,
}
