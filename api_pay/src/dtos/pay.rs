use chrono::NaiveDateTime;
use common::nowpayments::opt_string_or_number;
use db::models::payment::Payment;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Body of `POST /api/payments/create-invoice`. Every field is optional at the
/// serde level so that missing fields produce a readable 400.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoiceRequest {
    pub amount: Option<f64>,
    pub currency: Option<String>,
    pub network: Option<String>,
    pub order_data: Option<OrderData>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderData {
    #[serde(default)]
    pub pair_ids: Vec<Uuid>,
    pub period: Option<String>,
    pub plan: Option<String>,
    #[serde(default)]
    pub payment_items: Vec<PaymentItemInput>,
}

/// Line item priced by the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentItemInput {
    pub pair_id: Uuid,
    pub base_price: f64,
    #[serde(default)]
    pub discount_rate: f64,
    pub final_price: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoiceResponse {
    pub invoice_url: String,
    pub invoice_id: String,
    pub order_id: String,
    pub payment_id: Uuid,
    pub expires_at: NaiveDateTime,
}

/// IPN body posted by the gateway. Only the fields this service acts on.
#[derive(Debug, Clone, Deserialize)]
pub struct IpnNotification {
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub payment_id: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub invoice_id: Option<String>,
    pub payment_status: String,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub actually_paid: Option<f64>,
    #[serde(default)]
    pub payin_hash: Option<String>,
}

impl IpnNotification {
    /// Ledger key: one entry per (gateway payment, reported status).
    pub fn event_key(&self) -> String {
        let subject = self
            .payment_id
            .as_deref()
            .or(self.order_id.as_deref())
            .unwrap_or_default();
        format!("{}:{}", subject, self.payment_status.to_lowercase())
    }
}

#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub received: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicate: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_status: Option<String>,
    pub updated: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentListItem {
    pub id: Uuid,
    pub order_id: String,
    pub invoice_id: Option<String>,
    pub invoice_url: Option<String>,
    pub status: String,
    pub total_amount: f64,
    pub network: String,
    pub tx_hash: Option<String>,
    pub actually_paid: Option<f64>,
    pub expires_at: NaiveDateTime,
    pub created_at: NaiveDateTime,
}

impl From<Payment> for PaymentListItem {
    fn from(payment: Payment) -> Self {
        PaymentListItem {
            id: payment.id,
            order_id: payment.order_id,
            invoice_id: payment.invoice_id,
            invoice_url: payment.invoice_url,
            status: payment.status,
            total_amount: common::misc::cents_to_usd(payment.total_amount_cents),
            network: payment.network,
            tx_hash: payment.tx_hash,
            actually_paid: payment.actually_paid,
            expires_at: payment.expires_at,
            created_at: payment.created_at,
        }
    }
}
