use common::{error::Res, jwt::Principal, nowpayments::PaymentGateway};
use db::{dtos::payment::PaymentStatusUpdate, models::status::PaymentStatus};
use sqlx::PgPool;

use crate::{
    misc::gateway_status,
    services::reconcile::{self, Decision, Source},
};

#[derive(Debug, PartialEq)]
pub enum PollResult {
    NotFound,
    Status {
        status: PaymentStatus,
        gateway_status: Option<String>,
        updated: bool,
    },
}

/// Compares the stored payment with the gateway and applies the difference.
///
/// Gateway errors are not surfaced: the caller keeps polling and sees the
/// locally known status in the meantime. Matching statuses write nothing.
pub async fn poll_status(
    pool: &PgPool,
    gateway: &dyn PaymentGateway,
    principal: &Principal,
    invoice_id: &str,
) -> Res<PollResult> {
    let Some(payment) =
        db::payment::get_user_payment_by_invoice_id(pool, invoice_id, principal.user_id).await?
    else {
        return Ok(PollResult::NotFound);
    };

    let local = |gateway_status: Option<String>| PollResult::Status {
        status: payment.status(),
        gateway_status,
        updated: false,
    };

    let Some(gateway_payment_id) = payment.payment_id.as_deref() else {
        return Ok(local(None));
    };

    let remote = match gateway.get_payment(gateway_payment_id).await {
        Ok(Some(remote)) => remote,
        Ok(None) => return Ok(local(None)),
        Err(e) => {
            log::warn!("Payment lookup for {} failed: {}", gateway_payment_id, e);
            return Ok(local(None));
        }
    };

    let Some(target) = gateway_status::to_payment_status(&remote.payment_status) else {
        return Ok(local(Some(remote.payment_status)));
    };
    if reconcile::decide(payment.status(), target) != Decision::Apply {
        return Ok(local(Some(remote.payment_status)));
    }

    let mut tx = pool.begin().await?;

    // a webhook may have moved the payment since the unlocked read
    let locked = db::payment::get_payment_by_id_for_update(&mut *tx, payment.id).await?;
    let (status, updated) = match reconcile::decide(locked.status(), target) {
        Decision::Apply => {
            let update = PaymentStatusUpdate {
                status: target,
                payment_id: None,
                tx_hash: remote.payin_hash.clone(),
                actually_paid: remote.actually_paid,
            };
            let saved = reconcile::apply_transition(
                &mut *tx,
                &locked,
                update,
                Source::Poll,
                &remote.payment_status,
            )
            .await?;
            (saved.status(), true)
        }
        _ => (locked.status(), false),
    };

    tx.commit().await?;

    Ok(PollResult::Status {
        status,
        gateway_status: Some(remote.payment_status),
        updated,
    })
}
