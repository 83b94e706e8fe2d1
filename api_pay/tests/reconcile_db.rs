//! Reconciliation against a real Postgres. `sqlx::test` creates a fresh
//! database per test from `DATABASE_URL` and applies the service migrations.

mod support;

use api_pay::{
    dtos::pay::{CreateInvoiceRequest, CreateInvoiceResponse, IpnNotification},
    services::{
        invoice::create_invoice,
        status::{PollResult, poll_status},
        webhook::process_notification,
    },
};
use common::{error::AppError, jwt::Principal};
use db::models::{payment::Payment, status::PaymentStatus};
use serde_json::json;
use sqlx::PgPool;
use support::{MockGateway, config};
use uuid::Uuid;

fn principal() -> Principal {
    Principal {
        user_id: Uuid::new_v4(),
        email: "trader@algomakers.ai".to_string(),
    }
}

fn invoice_request(amount: f64, pairs: usize) -> CreateInvoiceRequest {
    let pair_ids: Vec<Uuid> = (0..pairs).map(|_| Uuid::new_v4()).collect();
    serde_json::from_value(json!({
        "amount": amount,
        "currency": "usd",
        "network": "usdttrc20",
        "orderData": { "pairIds": pair_ids, "period": "ONE_MONTH" }
    }))
    .unwrap()
}

fn ipn(order_id: &str, payment_status: &str) -> IpnNotification {
    serde_json::from_value(json!({
        "payment_id": 777,
        "payment_status": payment_status,
        "order_id": order_id,
        "actually_paid": 49.99,
        "payin_hash": "0xabc"
    }))
    .unwrap()
}

async fn open_invoice(pool: &PgPool, gateway: &MockGateway, who: &Principal) -> CreateInvoiceResponse {
    create_invoice(pool, gateway, &config("development"), who, invoice_request(50.0, 2))
        .await
        .unwrap()
}

async fn payment(pool: &PgPool, order_id: &str) -> Payment {
    sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE order_id = $1")
        .bind(order_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn subscription_statuses(pool: &PgPool, payment_id: Uuid) -> Vec<String> {
    sqlx::query_scalar::<_, String>(
        "SELECT s.status FROM subscriptions s
         JOIN payment_items pi ON pi.subscription_id = s.id
         WHERE pi.payment_id = $1",
    )
    .bind(payment_id)
    .fetch_all(pool)
    .await
    .unwrap()
}

async fn count(pool: &PgPool, table: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await
        .unwrap()
}

#[sqlx::test(migrations = "../db/migrations")]
async fn valid_invoice_writes_pending_payment_and_one_subscription_per_pair(pool: PgPool) {
    let gateway = MockGateway::new(false);
    let who = principal();

    let invoice = open_invoice(&pool, &gateway, &who).await;

    let saved = payment(&pool, &invoice.order_id).await;
    assert_eq!(saved.status(), PaymentStatus::Pending);
    assert_eq!(saved.user_id, who.user_id);
    assert_eq!(saved.total_amount_cents, 5000);
    assert_eq!(saved.invoice_id.as_deref(), Some(invoice.invoice_id.as_str()));
    assert!(invoice.order_id.starts_with("AM-"));

    assert_eq!(subscription_statuses(&pool, saved.id).await, vec!["PENDING", "PENDING"]);
    let item_total: i64 = sqlx::query_scalar(
        "SELECT SUM(final_price_cents)::BIGINT FROM payment_items WHERE payment_id = $1",
    )
    .bind(saved.id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(item_total, 5000);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn gateway_failure_leaves_no_rows(pool: PgPool) {
    let gateway = MockGateway::new(true);

    let res = create_invoice(
        &pool,
        gateway.as_ref(),
        &config("development"),
        &principal(),
        invoice_request(50.0, 2),
    )
    .await;

    assert!(matches!(res, Err(AppError::Gateway { .. })));
    assert_eq!(count(&pool, "payments").await, 0);
    assert_eq!(count(&pool, "subscriptions").await, 0);
    assert_eq!(count(&pool, "payment_items").await, 0);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn replayed_finished_webhook_stays_paid_and_is_reported_as_duplicate(pool: PgPool) {
    let gateway = MockGateway::new(false);
    let invoice = open_invoice(&pool, &gateway, &principal()).await;

    let first = process_notification(&pool, ipn(&invoice.order_id, "finished")).await.unwrap();
    assert_eq!(first.matched, Some(true));
    assert_eq!(first.duplicate, None);
    assert_eq!(first.status.as_deref(), Some("PAID"));

    let replay = process_notification(&pool, ipn(&invoice.order_id, "finished")).await.unwrap();
    assert_eq!(replay.duplicate, Some(true));

    let saved = payment(&pool, &invoice.order_id).await;
    assert_eq!(saved.status(), PaymentStatus::Paid);
    assert_eq!(saved.payment_id.as_deref(), Some("777"));
    assert_eq!(saved.tx_hash.as_deref(), Some("0xabc"));
    assert_eq!(subscription_statuses(&pool, saved.id).await, vec!["ACTIVE", "ACTIVE"]);
    assert_eq!(count(&pool, "payment_events").await, 1);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn expired_webhook_leaves_subscriptions_pending(pool: PgPool) {
    let gateway = MockGateway::new(false);
    let invoice = open_invoice(&pool, &gateway, &principal()).await;

    let res = process_notification(&pool, ipn(&invoice.order_id, "expired")).await.unwrap();
    assert_eq!(res.status.as_deref(), Some("EXPIRED"));

    let saved = payment(&pool, &invoice.order_id).await;
    assert_eq!(saved.status(), PaymentStatus::Expired);
    assert_eq!(subscription_statuses(&pool, saved.id).await, vec!["PENDING", "PENDING"]);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn webhook_for_unknown_order_is_acknowledged_unmatched(pool: PgPool) {
    let res = process_notification(&pool, ipn("AM-unknown", "finished")).await.unwrap();

    assert!(res.received);
    assert_eq!(res.matched, Some(false));
    assert_eq!(count(&pool, "webhook_events").await, 0);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn in_flight_webhook_keeps_gateway_id_so_poll_can_settle(pool: PgPool) {
    let gateway = MockGateway::new(false);
    let who = principal();
    let invoice = open_invoice(&pool, &gateway, &who).await;

    let res = process_notification(&pool, ipn(&invoice.order_id, "waiting")).await.unwrap();
    assert_eq!(res.status.as_deref(), Some("PENDING"));
    let saved = payment(&pool, &invoice.order_id).await;
    assert_eq!(saved.payment_id.as_deref(), Some("777"));
    assert_eq!(saved.status(), PaymentStatus::Pending);

    // the finished callback never arrives; the poll has to find it
    gateway.set_remote("777", "finished");
    let polled = poll_status(&pool, gateway.as_ref(), &who, &invoice.invoice_id).await.unwrap();

    assert_eq!(gateway.lookups(), 1);
    assert_eq!(
        polled,
        PollResult::Status {
            status: PaymentStatus::Paid,
            gateway_status: Some("finished".to_string()),
            updated: true,
        }
    );
    let saved = payment(&pool, &invoice.order_id).await;
    assert_eq!(saved.status(), PaymentStatus::Paid);
    assert_eq!(subscription_statuses(&pool, saved.id).await, vec!["ACTIVE", "ACTIVE"]);

    let sources: Vec<String> = sqlx::query_scalar("SELECT source FROM payment_events")
        .fetch_all(&pool)
        .await
        .unwrap();
    assert_eq!(sources, vec!["poll"]);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn poll_with_matching_status_writes_nothing(pool: PgPool) {
    let gateway = MockGateway::new(false);
    let who = principal();
    let invoice = open_invoice(&pool, &gateway, &who).await;
    process_notification(&pool, ipn(&invoice.order_id, "confirming")).await.unwrap();
    let before = payment(&pool, &invoice.order_id).await;

    gateway.set_remote("777", "waiting");
    let polled = poll_status(&pool, gateway.as_ref(), &who, &invoice.invoice_id).await.unwrap();

    assert_eq!(
        polled,
        PollResult::Status {
            status: PaymentStatus::Pending,
            gateway_status: Some("waiting".to_string()),
            updated: false,
        }
    );
    let after = payment(&pool, &invoice.order_id).await;
    assert_eq!(after.updated_at, before.updated_at);
    assert_eq!(after.status, before.status);
    assert_eq!(count(&pool, "payment_events").await, 0);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn poll_without_gateway_id_reports_local_status(pool: PgPool) {
    let gateway = MockGateway::new(false);
    let who = principal();
    let invoice = open_invoice(&pool, &gateway, &who).await;

    let polled = poll_status(&pool, gateway.as_ref(), &who, &invoice.invoice_id).await.unwrap();

    assert_eq!(gateway.lookups(), 0);
    assert_eq!(
        polled,
        PollResult::Status {
            status: PaymentStatus::Pending,
            gateway_status: None,
            updated: false,
        }
    );
}

#[sqlx::test(migrations = "../db/migrations")]
async fn poll_for_someone_elses_invoice_is_not_found(pool: PgPool) {
    let gateway = MockGateway::new(false);
    let invoice = open_invoice(&pool, &gateway, &principal()).await;

    let polled = poll_status(&pool, gateway.as_ref(), &principal(), &invoice.invoice_id)
        .await
        .unwrap();

    assert_eq!(polled, PollResult::NotFound);
}
