use chrono::Utc;
use common::error::Res;
use db::{
    dtos::{payment::PaymentStatusUpdate, payment_event::PaymentEventCreateRequest},
    models::{
        payment::Payment,
        status::{PaymentStatus, Period},
    },
};
use sqlx::PgConnection;

/// What to do with a payment given the status the gateway reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Decision {
    Apply,
    Unchanged,
    Rejected,
}

pub(crate) fn decide(current: PaymentStatus, target: PaymentStatus) -> Decision {
    if current == target {
        Decision::Unchanged
    } else if current.can_transition_to(target) {
        Decision::Apply
    } else {
        Decision::Rejected
    }
}

/// Who observed the gateway state.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Source {
    Webhook,
    Poll,
}

impl Source {
    fn as_str(&self) -> &'static str {
        match self {
            Source::Webhook => "webhook",
            Source::Poll => "poll",
        }
    }
}

/// Writes a status transition on a row already locked by the caller's
/// transaction, records it in the audit log and, when the payment becomes
/// PAID, activates the subscriptions bought with it.
pub(crate) async fn apply_transition(
    conn: &mut PgConnection,
    payment: &Payment,
    update: PaymentStatusUpdate,
    source: Source,
    gateway_status: &str,
) -> Res<Payment> {
    let from_status = payment.status();
    let to_status = update.status;

    let updated = db::payment::update_payment_status(&mut *conn, payment.id, update).await?;

    db::payment_event::insert_payment_event(
        &mut *conn,
        PaymentEventCreateRequest {
            payment_id: payment.id,
            source: source.as_str(),
            from_status,
            to_status,
            gateway_status: Some(gateway_status),
        },
    )
    .await?;

    log::info!(
        "Payment {} ({}) {} -> {} via {}",
        payment.id,
        payment.order_id,
        from_status,
        to_status,
        source.as_str()
    );

    if to_status == PaymentStatus::Paid {
        activate_subscriptions(conn, &updated).await?;
    }

    Ok(updated)
}

async fn activate_subscriptions(conn: &mut PgConnection, payment: &Payment) -> Res<()> {
    let pending = db::subscription::get_pending_subscriptions_by_payment(&mut *conn, payment.id).await?;
    let start = Utc::now().naive_utc();

    for sub in pending {
        let period = sub.period.parse::<Period>().unwrap_or(Period::OneMonth);
        db::subscription::activate_subscription(
            &mut *conn,
            sub.id,
            payment.id,
            start,
            period.expiry_from(start),
        )
        .await?;
        log::info!(
            "Subscription {} for pair {} activated until {}",
            sub.id,
            sub.pair_id,
            period.expiry_from(start)
        );
    }

    Ok(())
}
