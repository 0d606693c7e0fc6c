//! Entitlement activation: the only writer of user premium state.

use rusqlite::{Connection, TransactionBehavior};

use crate::db::queries;
use crate::error::Result;
use crate::models::{CreateLedgerEntry, PaymentIntent};
use crate::payments::PaymentEvent;
use crate::plans::PlanKind;

#[derive(Debug, Clone)]
pub struct Activation {
    pub intent_id: String,
    pub user_id: String,
    pub plan: PlanKind,
    pub paid_at: i64,
    pub expire_date: i64,
    pub ledger_entry_id: String,
}

#[derive(Debug)]
pub enum ActivationResult {
    Activated(Activation),
    /// A concurrent delivery won one of the atomic claims; nothing was
    /// changed by this call.
    AlreadyApplied,
}

/// Apply the paid transition, ledger insert and entitlement grant as one
/// transaction. Either all four effects land or none do; the partial-apply
/// window between intent transition and entitlement update does not exist
/// from the caller's perspective.
///
/// IMMEDIATE mode takes the write lock up front, so two racing deliveries
/// serialize here and the loser sees the conditional UPDATE claim zero rows.
pub fn activate(
    conn: &mut Connection,
    intent: &PaymentIntent,
    event: &PaymentEvent,
    paid_at: i64,
) -> Result<ActivationResult> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    // Losing the claim means another delivery settled this intent first;
    // dropping the transaction rolls back nothing of consequence.
    if !queries::try_mark_intent_paid(&tx, &intent.id)? {
        return Ok(ActivationResult::AlreadyApplied);
    }

    let expire_date = intent.plan.expire_date(paid_at);

    let entry = queries::try_insert_ledger_entry(
        &tx,
        &CreateLedgerEntry {
            provider: event.provider,
            provider_payment_id: (!event.external_id.is_empty())
                .then(|| event.external_id.clone()),
            user_id: intent.user_id.clone(),
            plan: intent.plan,
            amount_cents: event.amount_cents,
            paid_at,
        },
    )?;
    let Some(entry) = entry else {
        // Uniqueness constraint hit: the charge is already on the ledger.
        // Roll back the intent transition too; this delivery applies nothing.
        return Ok(ActivationResult::AlreadyApplied);
    };

    queries::grant_entitlement(&tx, &intent.user_id, paid_at, expire_date)?;

    tx.commit()?;

    Ok(ActivationResult::Activated(Activation {
        intent_id: intent.id.clone(),
        user_id: intent.user_id.clone(),
        plan: intent.plan,
        paid_at,
        expire_date,
        ledger_entry_id: entry.id,
    }))
}
