use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::payments::{EventStatus, PaymentEvent, PaymentProvider};

const API_BASE: &str = "https://api.mercadopago.com";

#[derive(Debug, Clone)]
pub struct MercadoPagoConfig {
    pub access_token: String,
    /// Public URL MercadoPago should deliver webhooks to
    pub notification_url: Option<String>,
}

/// MercadoPago webhook body. It carries only an action and a numeric payment
/// id; amount, status, payer and external_reference all require a secondary
/// authenticated lookup against the payments API.
#[derive(Debug, Deserialize)]
pub struct MercadoPagoWebhook {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(rename = "type", default)]
    pub topic: Option<String>,
    pub data: MercadoPagoWebhookData,
}

#[derive(Debug, Deserialize)]
pub struct MercadoPagoWebhookData {
    /// Arrives as a number in some payloads and a string in others
    pub id: Value,
}

impl MercadoPagoWebhook {
    /// Whether this notification concerns a payment at all. MercadoPago also
    /// delivers merchant_order and plan topics on the same URL.
    pub fn is_payment(&self) -> bool {
        self.action
            .as_deref()
            .map(|a| a.starts_with("payment."))
            .unwrap_or(false)
            || self.topic.as_deref() == Some("payment")
    }

    pub fn payment_id(&self) -> Option<String> {
        match &self.data.id {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Payment resource as returned by `GET /v1/payments/{id}`.
#[derive(Debug, Deserialize)]
pub struct MercadoPagoPayment {
    pub id: Value,
    pub status: String,
    /// Decimal BRL, converted to cents at the adapter boundary
    pub transaction_amount: f64,
    #[serde(default)]
    pub external_reference: Option<String>,
    #[serde(default)]
    pub payer: Option<MercadoPagoPayer>,
}

#[derive(Debug, Deserialize)]
pub struct MercadoPagoPayer {
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreatePixPaymentRequest<'a> {
    transaction_amount: f64,
    description: &'a str,
    payment_method_id: &'static str,
    external_reference: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    notification_url: Option<&'a str>,
    payer: PixPayer<'a>,
}

#[derive(Debug, Serialize)]
struct PixPayer<'a> {
    email: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreatePixPaymentResponse {
    id: Value,
    #[serde(default)]
    point_of_interaction: Option<PointOfInteraction>,
}

#[derive(Debug, Deserialize)]
struct PointOfInteraction {
    #[serde(default)]
    transaction_data: Option<PixTransactionData>,
}

#[derive(Debug, Deserialize)]
struct PixTransactionData {
    #[serde(default)]
    qr_code: Option<String>,
    #[serde(default)]
    ticket_url: Option<String>,
}

/// Result of creating a PIX charge at checkout time.
#[derive(Debug, Clone)]
pub struct MercadoPagoCharge {
    pub payment_id: String,
    pub qr_code: Option<String>,
    pub payment_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MercadoPagoClient {
    client: Client,
    access_token: String,
    notification_url: Option<String>,
}

impl MercadoPagoClient {
    pub fn new(config: &MercadoPagoConfig) -> Self {
        Self {
            client: Client::new(),
            access_token: config.access_token.clone(),
            notification_url: config.notification_url.clone(),
        }
    }

    /// Authoritative payment lookup. A failure here must bubble up as a 5xx
    /// so MercadoPago redelivers the webhook.
    pub async fn get_payment(&self, payment_id: &str) -> Result<MercadoPagoPayment> {
        let response = self
            .client
            .get(format!("{}/v1/payments/{}", API_BASE, payment_id))
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| AppError::ProviderApi {
                provider: "mercadopago",
                message: format!("payment lookup failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ProviderApi {
                provider: "mercadopago",
                message: format!("payment lookup returned {}: {}", status, body),
            });
        }

        response.json().await.map_err(|e| AppError::ProviderApi {
            provider: "mercadopago",
            message: format!("invalid payment lookup response: {}", e),
        })
    }

    /// Create a PIX charge for a checkout. The external reference is the
    /// composite `{user_id}_{plan}_{intent_id}` the matcher parses back out
    /// of the webhook.
    pub async fn create_pix_payment(
        &self,
        amount_cents: i64,
        description: &str,
        external_reference: &str,
        payer_email: &str,
    ) -> Result<MercadoPagoCharge> {
        let request = CreatePixPaymentRequest {
            transaction_amount: cents_to_decimal(amount_cents),
            description,
            payment_method_id: "pix",
            external_reference,
            notification_url: self.notification_url.as_deref(),
            payer: PixPayer { email: payer_email },
        };

        let response = self
            .client
            .post(format!("{}/v1/payments", API_BASE))
            .bearer_auth(&self.access_token)
            .header("X-Idempotency-Key", external_reference)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::ProviderApi {
                provider: "mercadopago",
                message: format!("payment creation failed: {}", e),
            })?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ProviderApi {
                provider: "mercadopago",
                message: format!("payment creation rejected: {}", body),
            });
        }

        let created: CreatePixPaymentResponse =
            response.json().await.map_err(|e| AppError::ProviderApi {
                provider: "mercadopago",
                message: format!("invalid payment creation response: {}", e),
            })?;

        let tx = created
            .point_of_interaction
            .and_then(|p| p.transaction_data);
        Ok(MercadoPagoCharge {
            payment_id: match created.id {
                Value::Number(n) => n.to_string(),
                Value::String(s) => s,
                other => other.to_string(),
            },
            qr_code: tx.as_ref().and_then(|t| t.qr_code.clone()),
            payment_url: tx.and_then(|t| t.ticket_url),
        })
    }
}

/// Normalize a fetched payment into the canonical event.
pub fn normalize_payment(payment: &MercadoPagoPayment) -> PaymentEvent {
    let status = match payment.status.as_str() {
        "approved" => EventStatus::Approved,
        "pending" | "in_process" | "authorized" => EventStatus::Pending,
        _ => EventStatus::Rejected,
    };

    PaymentEvent {
        provider: PaymentProvider::MercadoPago,
        external_id: match &payment.id {
            Value::Number(n) => n.to_string(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        },
        amount_cents: decimal_to_cents(payment.transaction_amount),
        status,
        payer_email: payment.payer.as_ref().and_then(|p| p.email.clone()),
        correlation_ref: payment
            .external_reference
            .as_ref()
            .filter(|r| !r.is_empty())
            .cloned(),
    }
}

/// MercadoPago reports decimal BRL; everything internal is centavos.
pub fn decimal_to_cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

fn cents_to_decimal(cents: i64) -> f64 {
    (cents as f64) / 100.0
}
