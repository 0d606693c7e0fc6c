pub mod mercadopago;
pub mod pushinpay;
pub mod stripe;

pub use mercadopago::*;
pub use pushinpay::*;
pub use stripe::*;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentProvider {
    MercadoPago,
    PushinPay,
    Stripe,
}

impl PaymentProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentProvider::MercadoPago => "mercadopago",
            PaymentProvider::PushinPay => "pushinpay",
            PaymentProvider::Stripe => "stripe",
        }
    }
}

impl std::str::FromStr for PaymentProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mercadopago" | "mp" => Ok(PaymentProvider::MercadoPago),
            "pushinpay" => Ok(PaymentProvider::PushinPay),
            "stripe" => Ok(PaymentProvider::Stripe),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for PaymentProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider-reported charge state, collapsed to the three cases the
/// reconciliation pipeline distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Approved,
    Pending,
    Rejected,
}

/// Canonical payment notification. Every adapter converges here; the rest of
/// the pipeline never sees a provider wire format.
#[derive(Debug, Clone)]
pub struct PaymentEvent {
    pub provider: PaymentProvider,
    /// Provider-assigned transaction id (PushinPay ids arrive uppercased)
    pub external_id: String,
    pub amount_cents: i64,
    pub status: EventStatus,
    pub payer_email: Option<String>,
    /// Provider-specific correlation string; format varies per provider
    pub correlation_ref: Option<String>,
}

/// Per-provider credentials, resolved once at startup and injected through
/// `AppState` rather than re-read mid-pipeline.
#[derive(Debug, Clone, Default)]
pub struct ProviderSettings {
    pub mercadopago: Option<MercadoPagoConfig>,
    pub pushinpay: Option<PushinPayConfig>,
    pub stripe: Option<StripeConfig>,
    pub default_provider: Option<PaymentProvider>,
}

impl ProviderSettings {
    /// Pick the provider for a checkout: explicit choice, configured default,
    /// or the single configured provider. Ambiguity is left for the caller
    /// to turn into a 400.
    pub fn select(&self, explicit: Option<PaymentProvider>) -> Option<PaymentProvider> {
        if explicit.is_some() {
            return explicit;
        }
        if self.default_provider.is_some() {
            return self.default_provider;
        }
        let configured: Vec<PaymentProvider> = [
            self.mercadopago.as_ref().map(|_| PaymentProvider::MercadoPago),
            self.pushinpay.as_ref().map(|_| PaymentProvider::PushinPay),
            self.stripe.as_ref().map(|_| PaymentProvider::Stripe),
        ]
        .into_iter()
        .flatten()
        .collect();
        match configured.as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }
}
