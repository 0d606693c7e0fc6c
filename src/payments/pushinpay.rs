use reqwest::Client;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{AppError, Result};
use crate::payments::{EventStatus, PaymentEvent, PaymentProvider};

const API_BASE: &str = "https://api.pushinpay.com.br/api";

#[derive(Debug, Clone)]
pub struct PushinPayConfig {
    pub token: String,
    pub webhook_url: Option<String>,
}

/// PushinPay delivers the same webhook either as JSON or as
/// `application/x-www-form-urlencoded`, so numeric fields must accept both
/// native numbers and their string spellings.
fn de_cents<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    struct CentsVisitor;

    impl serde::de::Visitor<'_> for CentsVisitor {
        type Value = i64;

        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            f.write_str("an integer amount in cents, possibly as a string")
        }

        fn visit_i64<E: serde::de::Error>(self, v: i64) -> std::result::Result<i64, E> {
            Ok(v)
        }

        fn visit_u64<E: serde::de::Error>(self, v: u64) -> std::result::Result<i64, E> {
            Ok(v as i64)
        }

        fn visit_f64<E: serde::de::Error>(self, v: f64) -> std::result::Result<i64, E> {
            Ok(v.round() as i64)
        }

        fn visit_str<E: serde::de::Error>(self, v: &str) -> std::result::Result<i64, E> {
            v.trim().parse().map_err(serde::de::Error::custom)
        }
    }

    deserializer.deserialize_any(CentsVisitor)
}

fn empty_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

#[derive(Debug, Deserialize)]
pub struct PushinPayWebhook {
    /// Transaction UUID; compared case-insensitively, normalized to uppercase
    pub id: String,
    pub status: String,
    /// Amount already in cents
    #[serde(deserialize_with = "de_cents")]
    pub value: i64,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub payer_name: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub payer_national_registration: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub end_to_end_id: Option<String>,
}

impl PushinPayWebhook {
    /// Test/noise events carry no payer identification or a non-positive
    /// amount; they are acknowledged with a no-op 200 and never enter the
    /// pipeline.
    pub fn is_noise(&self) -> bool {
        self.value <= 0
            || (self.payer_name.is_none()
                && self.payer_national_registration.is_none()
                && self.end_to_end_id.is_none())
    }
}

/// Parse a PushinPay webhook body, branching on the request content type.
pub fn parse_webhook(content_type: Option<&str>, body: &[u8]) -> Result<PushinPayWebhook> {
    let is_form = content_type
        .map(|ct| ct.starts_with("application/x-www-form-urlencoded"))
        .unwrap_or(false);

    if is_form {
        serde_urlencoded::from_bytes(body)
            .map_err(|e| AppError::MalformedPayload(format!("pushinpay form body: {}", e)))
    } else {
        serde_json::from_slice(body)
            .map_err(|e| AppError::MalformedPayload(format!("pushinpay json body: {}", e)))
    }
}

/// Normalize a parsed webhook into the canonical event. The transaction UUID
/// is uppercased here so every later comparison is exact.
pub fn normalize_webhook(webhook: &PushinPayWebhook) -> PaymentEvent {
    let status = match webhook.status.to_lowercase().as_str() {
        "paid" => EventStatus::Approved,
        "created" | "pending" => EventStatus::Pending,
        _ => EventStatus::Rejected,
    };

    PaymentEvent {
        provider: PaymentProvider::PushinPay,
        external_id: webhook.id.to_uppercase(),
        amount_cents: webhook.value,
        status,
        payer_email: None,
        correlation_ref: Some(webhook.id.to_uppercase()),
    }
}

#[derive(Debug, Serialize)]
struct CreateCashInRequest<'a> {
    value: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    webhook_url: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct CreateCashInResponse {
    id: String,
    #[serde(default)]
    qr_code: Option<String>,
    #[serde(default)]
    qr_code_base64: Option<String>,
}

/// Result of creating a PIX cash-in at checkout time.
#[derive(Debug, Clone)]
pub struct PushinPayCharge {
    /// Uppercase transaction UUID, stored as the intent's provider_payment_id
    pub payment_id: String,
    pub qr_code: Option<String>,
    pub qr_code_base64: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PushinPayClient {
    client: Client,
    token: String,
    webhook_url: Option<String>,
}

impl PushinPayClient {
    pub fn new(config: &PushinPayConfig) -> Self {
        Self {
            client: Client::new(),
            token: config.token.clone(),
            webhook_url: config.webhook_url.clone(),
        }
    }

    pub async fn create_cash_in(&self, amount_cents: i64) -> Result<PushinPayCharge> {
        let request = CreateCashInRequest {
            value: amount_cents,
            webhook_url: self.webhook_url.as_deref(),
        };

        let response = self
            .client
            .post(format!("{}/pix/cashIn", API_BASE))
            .bearer_auth(&self.token)
            .header("Accept", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::ProviderApi {
                provider: "pushinpay",
                message: format!("cash-in creation failed: {}", e),
            })?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ProviderApi {
                provider: "pushinpay",
                message: format!("cash-in creation rejected: {}", body),
            });
        }

        let created: CreateCashInResponse =
            response.json().await.map_err(|e| AppError::ProviderApi {
                provider: "pushinpay",
                message: format!("invalid cash-in response: {}", e),
            })?;

        Ok(PushinPayCharge {
            payment_id: created.id.to_uppercase(),
            qr_code: created.qr_code,
            qr_code_base64: created.qr_code_base64,
        })
    }
}
