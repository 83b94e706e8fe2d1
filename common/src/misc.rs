/// Converts a USD amount as sent by clients into whole cents.
pub fn usd_to_cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

pub fn cents_to_usd(cents: i64) -> f64 {
    cents as f64 / 100.0
}
