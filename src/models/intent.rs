use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::payments::PaymentProvider;
use crate::plans::PlanKind;

/// Lifecycle of a checkout attempt. `Paid` is terminal and monotonic: once an
/// intent reaches it, no later transition is permitted and concurrent writers
/// must lose gracefully (enforced by conditional UPDATEs in the query layer).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum IntentStatus {
    Pending,
    Paid,
    Failed,
    Cancelled,
}

impl IntentStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, IntentStatus::Pending)
    }
}

/// One checkout attempt, the reconciliation source of truth.
///
/// `provider_ref` carries the provider-specific correlation string:
/// MercadoPago stores a composite `user_plan_intent` external reference,
/// PushinPay the uppercase transaction UUID, Stripe the checkout session id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub user_id: String,
    pub plan: PlanKind,
    /// Charge amount in minor currency units (centavos)
    pub amount_cents: i64,
    pub status: IntentStatus,
    pub provider: PaymentProvider,
    /// Provider-assigned transaction id, set once the provider responds
    pub provider_payment_id: Option<String>,
    pub provider_ref: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug)]
pub struct CreatePaymentIntent {
    pub user_id: String,
    pub plan: PlanKind,
    pub amount_cents: i64,
    pub provider: PaymentProvider,
    pub provider_payment_id: Option<String>,
    pub provider_ref: Option<String>,
}
