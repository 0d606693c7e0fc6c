use serde::{Deserialize, Serialize};

use crate::payments::PaymentProvider;
use crate::plans::PlanKind;

/// Append-only record of a successful charge, decoupled from the intent
/// lifecycle so reporting never touches transactional state.
///
/// Deduplicated by the `(provider, provider_payment_id)` uniqueness
/// constraint; rows without a provider id are absorbed by the ±24h heuristic
/// window in the idempotency guard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: String,
    pub provider: PaymentProvider,
    pub provider_payment_id: Option<String>,
    pub user_id: String,
    pub plan: PlanKind,
    pub amount_cents: i64,
    pub status: String,
    /// When the provider reported the charge as settled
    pub paid_at: i64,
    pub created_at: i64,
}

#[derive(Debug)]
pub struct CreateLedgerEntry {
    pub provider: PaymentProvider,
    pub provider_payment_id: Option<String>,
    pub user_id: String,
    pub plan: PlanKind,
    pub amount_cents: i64,
    pub paid_at: i64,
}
