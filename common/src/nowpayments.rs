use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};

use crate::{
    env_config::NowPaymentsConfig,
    error::{AppError, Res},
};

/// Body of `POST /v1/invoice`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateInvoice {
    pub price_amount: f64,
    pub price_currency: String,
    pub pay_currency: String,
    pub order_id: String,
    pub order_description: String,
    pub ipn_callback_url: String,
    pub success_url: String,
    pub cancel_url: String,
}

/// Hosted checkout session returned by the gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct Invoice {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub invoice_url: String,
    #[serde(default)]
    pub order_id: Option<String>,
}

/// Result of `GET /v1/payment/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayPayment {
    #[serde(deserialize_with = "string_or_number")]
    pub payment_id: String,
    pub payment_status: String,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub actually_paid: Option<f64>,
    #[serde(default)]
    pub payin_hash: Option<String>,
}

/// Outbound side of the crypto payment provider.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_invoice(&self, req: &CreateInvoice) -> Res<Invoice>;

    /// Returns `Ok(None)` when the provider does not know the payment.
    async fn get_payment(&self, payment_id: &str) -> Res<Option<GatewayPayment>>;
}

pub struct NowPaymentsClient {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
}

pub fn create_client(config: &NowPaymentsConfig) -> Res<NowPaymentsClient> {
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;

    Ok(NowPaymentsClient {
        http,
        api_url: config.api_url.clone(),
        api_key: config.api_key.clone(),
    })
}

#[async_trait]
impl PaymentGateway for NowPaymentsClient {
    async fn create_invoice(&self, req: &CreateInvoice) -> Res<Invoice> {
        let res = self
            .http
            .post(format!("{}/v1/invoice", self.api_url))
            .header("x-api-key", &self.api_key)
            .json(req)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(AppError::Gateway {
                operation: "create invoice",
                details: format!("{}: {}", status, body),
            });
        }

        res.json::<Invoice>().await.map_err(AppError::from)
    }

    async fn get_payment(&self, payment_id: &str) -> Res<Option<GatewayPayment>> {
        let res = self
            .http
            .get(format!("{}/v1/payment/{}", self.api_url, payment_id))
            .header("x-api-key", &self.api_key)
            .send()
            .await?;

        if res.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !res.status().is_success() {
            return Err(AppError::Gateway {
                operation: "look up payment",
                details: res.status().to_string(),
            });
        }

        res.json::<GatewayPayment>()
            .await
            .map(Some)
            .map_err(AppError::from)
    }
}

/// The gateway sends numeric ids in some payloads and strings in others.
pub fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

/// Same as [`string_or_number`] for optional fields; `null` maps to `None`.
pub fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(serde_json::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}
