//! Idempotency guard: the checks standing between a matched event and any
//! state mutation. Redelivery is the norm, not the exception: providers
//! only guarantee at-least-once.

use rusqlite::Connection;

use crate::db::queries;
use crate::error::Result;
use crate::models::{IntentStatus, PaymentIntent};
use crate::payments::PaymentEvent;
use crate::plans::AMOUNT_TOLERANCE_CENTS;

/// Heuristic dedup window for providers that omit a stable id on retry.
pub const DEDUP_WINDOW_SECONDS: i64 = 24 * 3600;

#[derive(Debug, PartialEq, Eq)]
pub enum GuardDecision {
    Proceed,
    /// The intent already settled; a second delivery of the same success.
    AlreadyPaid,
    /// A ledger row for `(provider, external_id)` already exists.
    DuplicateLedger,
    /// An id-less ledger row inside the ±24h window covers this charge.
    DuplicateWindow,
    /// Charged amount disagrees with the intent beyond tolerance; possible
    /// fraud or misrouted event. Never activates.
    AmountMismatch {
        intent_cents: i64,
        event_cents: i64,
    },
}

impl GuardDecision {
    pub fn permits_activation(&self) -> bool {
        matches!(self, GuardDecision::Proceed)
    }
}

/// Decide whether a matched event may activate. Runs after the matcher and
/// before any mutation; every refusal is still an HTTP 200.
pub fn should_activate(
    conn: &Connection,
    intent: &PaymentIntent,
    event: &PaymentEvent,
    now: i64,
) -> Result<GuardDecision> {
    if intent.status == IntentStatus::Paid {
        return Ok(GuardDecision::AlreadyPaid);
    }

    if !event.external_id.is_empty()
        && queries::ledger_entry_exists(conn, event.provider, &event.external_id)?
    {
        return Ok(GuardDecision::DuplicateLedger);
    }

    if queries::ledger_entry_in_window(
        conn,
        &intent.user_id,
        intent.plan,
        intent.amount_cents,
        now,
        DEDUP_WINDOW_SECONDS,
    )? {
        return Ok(GuardDecision::DuplicateWindow);
    }

    if (event.amount_cents - intent.amount_cents).abs() > AMOUNT_TOLERANCE_CENTS {
        return Ok(GuardDecision::AmountMismatch {
            intent_cents: intent.amount_cents,
            event_cents: event.amount_cents,
        });
    }

    Ok(GuardDecision::Proceed)
}
