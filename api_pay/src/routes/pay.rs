use std::sync::Arc;

use actix_web::{HttpRequest, HttpResponse, Responder, get, post, web};
use common::{
    env_config::Config,
    error::Res,
    http::Success,
    jwt::Principal,
    nowpayments::PaymentGateway,
};
use sqlx::PgPool;

use crate::{
    dtos::pay::{CreateInvoiceRequest, PaymentListItem, StatusResponse},
    services::{
        self,
        status::PollResult,
    },
};

/// Header carrying the hex HMAC-SHA512 of the IPN body.
pub const SIGNATURE_HEADER: &str = "x-nowpayments-sig";

/// Creates a crypto invoice for the authenticated user.
///
/// # Input
/// - `principal`: the authenticated caller
/// - `req`: JSON body with `amount` (USD, at least 20), `currency`, `network`
///   and `orderData` (`pairIds`, `period`, optional `paymentItems`)
///
/// # Output
/// - 201 with `invoiceUrl`, `invoiceId`, `orderId`, `paymentId`, `expiresAt`
/// - 400 for missing fields or an amount below the minimum
/// - 500 when the gateway refuses the invoice; nothing is stored in that case
///
/// # Frontend Example
/// ```javascript
/// const response = await fetch('/api/payments/create-invoice', {
///   method: 'POST',
///   headers: {
///     'Content-Type': 'application/json',
///     'Authorization': `Bearer ${token}`
///   },
///   body: JSON.stringify({
///     amount: 49.99,
///     currency: "usd",
///     network: "usdttrc20",
///     orderData: { pairIds: [pairId], period: "ONE_MONTH" }
///   })
/// });
/// const { invoiceUrl } = await response.json();
/// window.location.href = invoiceUrl;
/// ```
#[post("/create-invoice")]
pub async fn post_create_invoice(
    principal: web::ReqData<Principal>,
    req: web::Json<CreateInvoiceRequest>,
    pool: web::Data<Arc<PgPool>>,
    gateway: web::Data<Arc<dyn PaymentGateway>>,
    config: web::Data<Arc<Config>>,
) -> Res<impl Responder> {
    let invoice = services::invoice::create_invoice(
        &pool,
        gateway.get_ref().as_ref(),
        &config,
        &principal,
        req.into_inner(),
    )
    .await?;
    Success::created(invoice)
}

/// Receives IPN callbacks from NOWPayments.
///
/// # Note
/// This endpoint is not called by the frontend. The gateway calls it at the
/// `ipn_callback_url` given when the invoice was created, signing the body
/// with the IPN secret in the `x-nowpayments-sig` header.
///
/// # Output
/// - 200 `{ received, matched, duplicate?, status? }` once handled, including
///   for unknown orders and replays
/// - 401 for a bad signature in production
/// - 400 for an unparsable body or a missing `order_id`
#[post("")]
pub async fn post_webhook(
    body: web::Bytes,
    req: HttpRequest,
    pool: web::Data<Arc<PgPool>>,
    config: web::Data<Arc<Config>>,
) -> Res<impl Responder> {
    let signature = req
        .headers()
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    let ipn = services::webhook::authenticate(&body, signature, &config)?;
    let outcome = services::webhook::process_notification(&pool, ipn).await?;

    Success::ok(outcome)
}

/// Reconciles and returns the status of one of the caller's invoices.
///
/// # Output
/// - 200 `{ status, gatewayStatus?, updated }`, `status` in lower case
/// - 404 `{ status: "not_found" }` when the invoice is unknown to this user
#[get("/status/{invoice_id}")]
pub async fn get_status(
    principal: web::ReqData<Principal>,
    path: web::Path<String>,
    pool: web::Data<Arc<PgPool>>,
    gateway: web::Data<Arc<dyn PaymentGateway>>,
) -> Res<HttpResponse> {
    let invoice_id = path.into_inner();
    let result = services::status::poll_status(
        &pool,
        gateway.get_ref().as_ref(),
        &principal,
        &invoice_id,
    )
    .await?;

    Ok(match result {
        PollResult::NotFound => HttpResponse::NotFound().json(StatusResponse {
            status: "not_found".to_string(),
            gateway_status: None,
            updated: false,
        }),
        PollResult::Status {
            status,
            gateway_status,
            updated,
        } => HttpResponse::Ok().json(StatusResponse {
            status: status.as_str().to_lowercase(),
            gateway_status,
            updated,
        }),
    })
}

/// Lists the caller's payments, newest first.
#[get("")]
pub async fn get_payments(
    principal: web::ReqData<Principal>,
    pool: web::Data<Arc<PgPool>>,
) -> Res<impl Responder> {
    let payments = db::payment::get_payments_by_user_id(pool.get_ref().as_ref(), principal.user_id)
        .await?
        .into_iter()
        .map(PaymentListItem::from)
        .collect::<Vec<_>>();
    Success::ok(payments)
}
