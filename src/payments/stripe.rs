use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::{AppError, Result};
use crate::payments::{EventStatus, PaymentEvent, PaymentProvider};

type HmacSha256 = Hmac<Sha256>;

const API_BASE: &str = "https://api.stripe.com/v1";

/// Maximum age of a webhook timestamp before the signature is rejected
/// (replay protection).
const SIGNATURE_TOLERANCE_SECONDS: i64 = 300;

#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub secret_key: String,
    pub webhook_secret: String,
}

#[derive(Debug, Clone)]
pub struct StripeClient {
    client: Client,
    secret_key: String,
    webhook_secret: String,
}

impl StripeClient {
    pub fn new(config: &StripeConfig) -> Self {
        Self {
            client: Client::new(),
            secret_key: config.secret_key.clone(),
            webhook_secret: config.webhook_secret.clone(),
        }
    }

    /// Verify a `stripe-signature` header (`t=<ts>,v1=<hmac>`) against the
    /// raw body. The signed payload is `"{t}.{body}"`; comparison is
    /// constant-time and timestamps older than the tolerance are rejected.
    pub fn verify_webhook_signature(&self, payload: &[u8], signature: &str) -> Result<bool> {
        let mut timestamp: Option<&str> = None;
        let mut candidates: Vec<&str> = Vec::new();

        for part in signature.split(',') {
            match part.trim().split_once('=') {
                Some(("t", v)) => timestamp = Some(v),
                Some(("v1", v)) => candidates.push(v),
                _ => {}
            }
        }

        let Some(timestamp) = timestamp else {
            return Ok(false);
        };
        if candidates.is_empty() {
            return Ok(false);
        }

        let Ok(ts) = timestamp.parse::<i64>() else {
            return Ok(false);
        };
        let now = chrono::Utc::now().timestamp();
        if (now - ts).abs() > SIGNATURE_TOLERANCE_SECONDS {
            return Ok(false);
        }

        let signed_payload = format!("{}.{}", timestamp, String::from_utf8_lossy(payload));
        let mut mac = HmacSha256::new_from_slice(self.webhook_secret.as_bytes())
            .map_err(|_| AppError::Internal("invalid webhook secret".into()))?;
        mac.update(signed_payload.as_bytes());
        let expected = hex::encode(mac.finalize().into_bytes());

        Ok(candidates
            .iter()
            .any(|c| expected.as_bytes().ct_eq(c.as_bytes()).into()))
    }

    /// Create a hosted checkout session. The intent id rides in
    /// `metadata[payment_session_id]` and comes back on the
    /// `checkout.session.completed` webhook.
    pub async fn create_checkout_session(
        &self,
        intent_id: &str,
        plan_name: &str,
        amount_cents: i64,
        currency: &str,
        customer_email: &str,
        success_url: &str,
        cancel_url: &str,
    ) -> Result<StripeCheckoutCreated> {
        let amount = amount_cents.to_string();
        let params: Vec<(&str, &str)> = vec![
            ("mode", "payment"),
            ("success_url", success_url),
            ("cancel_url", cancel_url),
            ("customer_email", customer_email),
            ("line_items[0][quantity]", "1"),
            ("line_items[0][price_data][currency]", currency),
            ("line_items[0][price_data][unit_amount]", &amount),
            ("line_items[0][price_data][product_data][name]", plan_name),
            ("metadata[payment_session_id]", intent_id),
        ];

        let response = self
            .client
            .post(format!("{}/checkout/sessions", API_BASE))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&params)
            .send()
            .await
            .map_err(|e| AppError::ProviderApi {
                provider: "stripe",
                message: format!("checkout session creation failed: {}", e),
            })?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ProviderApi {
                provider: "stripe",
                message: format!("checkout session rejected: {}", body),
            });
        }

        response.json().await.map_err(|e| AppError::ProviderApi {
            provider: "stripe",
            message: format!("invalid checkout session response: {}", e),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeCheckoutCreated {
    pub id: String,
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StripeWebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

#[derive(Debug, Deserialize)]
pub struct StripeEventData {
    pub object: Value,
}

#[derive(Debug, Deserialize)]
pub struct StripeCheckoutSession {
    pub id: String,
    pub payment_status: String,
    #[serde(default)]
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_details: Option<StripeCustomerDetails>,
    #[serde(default)]
    pub metadata: StripeSessionMetadata,
}

#[derive(Debug, Deserialize)]
pub struct StripeCustomerDetails {
    #[serde(default)]
    pub email: Option<String>,
}

/// Checkout metadata discriminates the two Stripe flows: the normal flow
/// carries the intent id in `payment_session_id`, the landing-page flow only
/// an email. The matcher resolves each differently.
#[derive(Debug, Default, Deserialize)]
pub struct StripeSessionMetadata {
    #[serde(default)]
    pub payment_session_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl StripeCheckoutSession {
    fn payer_email(&self) -> Option<String> {
        self.metadata
            .email
            .clone()
            .or_else(|| self.customer_email.clone())
            .or_else(|| {
                self.customer_details
                    .as_ref()
                    .and_then(|d| d.email.clone())
            })
    }
}

/// Normalize a verified checkout session into the canonical event.
pub fn normalize_checkout_session(session: &StripeCheckoutSession) -> PaymentEvent {
    let status = match session.payment_status.as_str() {
        "paid" | "no_payment_required" => EventStatus::Approved,
        "unpaid" => EventStatus::Pending,
        _ => EventStatus::Rejected,
    };

    PaymentEvent {
        provider: PaymentProvider::Stripe,
        external_id: session.id.clone(),
        amount_cents: session.amount_total.unwrap_or(0),
        status,
        payer_email: session.payer_email(),
        correlation_ref: session.metadata.payment_session_id.clone(),
    }
}
