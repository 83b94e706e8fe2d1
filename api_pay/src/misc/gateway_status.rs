use db::models::status::PaymentStatus;

/// Local payment status implied by a gateway `payment_status`.
///
/// In-flight states map to PENDING. `refunded` and unknown values have no
/// local counterpart and return `None`.
pub fn to_payment_status(gateway_status: &str) -> Option<PaymentStatus> {
    match gateway_status.trim().to_lowercase().as_str() {
        "finished" | "confirmed" => Some(PaymentStatus::Paid),
        "partially_paid" => Some(PaymentStatus::Underpaid),
        "expired" => Some(PaymentStatus::Expired),
        "failed" => Some(PaymentStatus::Failed),
        "waiting" | "confirming" | "sending" => Some(PaymentStatus::Pending),
        _ => None,
    }
}
