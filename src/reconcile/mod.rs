//! The reconciliation pipeline: canonical event in, idempotent state
//! transition out.
//!
//! Every webhook handler converges here after its adapter produced a
//! `PaymentEvent`. The pipeline is written so that provider redelivery is
//! always safe: there is no internal retry queue, and none of the outcomes
//! below is an error from the provider's point of view.

pub mod activate;
pub mod guard;
pub mod matcher;

pub use activate::{activate, Activation, ActivationResult};
pub use guard::{should_activate, GuardDecision, DEDUP_WINDOW_SECONDS};
pub use matcher::{resolve, MatchOutcome};

use chrono::Utc;

use crate::db::{queries, DbPool};
use crate::error::Result;
use crate::models::IntentStatus;
use crate::payments::{EventStatus, PaymentEvent};
use crate::plans::PlanPricing;

/// What the pipeline did with an event. All variants answer HTTP 200; the
/// distinction exists for logging and tests.
#[derive(Debug)]
pub enum Outcome {
    Activated(Activation),
    /// Duplicate delivery of an already-settled charge; no state changed.
    AlreadyProcessed,
    /// No strategy resolved an intent. Expected for noise/test webhooks.
    NoMatch,
    /// Amount disagreed with the matched intent; flagged, not activated.
    AmountMismatch,
    /// A rejection/expiry moved the intent to a terminal failure state.
    MarkedFailed,
    /// Provider says the charge is still in flight; nothing to do yet.
    IgnoredPending,
}

pub fn process_event(pool: &DbPool, pricing: &PlanPricing, event: &PaymentEvent) -> Result<Outcome> {
    let mut conn = pool.get()?;
    let now = Utc::now().timestamp();

    match event.status {
        EventStatus::Pending => {
            // Stamp the provider's transaction id on the matched intent so
            // the provider-id strategy resolves the eventual approval even
            // if the correlation ref stops parsing.
            if let MatchOutcome::Matched { intent, .. } = resolve(&conn, event, pricing)? {
                if intent.provider_payment_id.is_none() {
                    queries::set_intent_provider_payment_id(&conn, &intent.id, &event.external_id)?;
                }
            }
            tracing::info!(
                provider = %event.provider,
                external_id = %event.external_id,
                "charge still pending at provider, no action"
            );
            Ok(Outcome::IgnoredPending)
        }

        EventStatus::Rejected => match resolve(&conn, event, pricing)? {
            MatchOutcome::Matched { intent, strategy } => {
                let moved =
                    queries::try_mark_intent_terminal(&conn, &intent.id, IntentStatus::Failed)?;
                tracing::info!(
                    provider = %event.provider,
                    external_id = %event.external_id,
                    intent_id = %intent.id,
                    strategy,
                    moved,
                    "charge rejected by provider"
                );
                // `moved == false` means the intent already settled or
                // already failed; paid stays paid.
                Ok(if moved {
                    Outcome::MarkedFailed
                } else {
                    Outcome::AlreadyProcessed
                })
            }
            _ => {
                tracing::info!(
                    provider = %event.provider,
                    external_id = %event.external_id,
                    "rejected charge matched no intent, dropping"
                );
                Ok(Outcome::NoMatch)
            }
        },

        EventStatus::Approved => {
            let intent = match resolve(&conn, event, pricing)? {
                MatchOutcome::Matched { intent, strategy } => {
                    tracing::info!(
                        provider = %event.provider,
                        external_id = %event.external_id,
                        intent_id = %intent.id,
                        strategy,
                        "approved charge matched intent"
                    );
                    intent
                }
                MatchOutcome::Created(intent) => intent,
                MatchOutcome::NotFound => {
                    tracing::warn!(
                        provider = %event.provider,
                        external_id = %event.external_id,
                        "approved charge matched no intent, dropping"
                    );
                    return Ok(Outcome::NoMatch);
                }
            };

            match should_activate(&conn, &intent, event, now)? {
                GuardDecision::Proceed => match activate(&mut conn, &intent, event, now)? {
                    ActivationResult::Activated(activation) => {
                        tracing::info!(
                            provider = %event.provider,
                            external_id = %event.external_id,
                            intent_id = %activation.intent_id,
                            user_id = %activation.user_id,
                            plan = %activation.plan,
                            expire_date = activation.expire_date,
                            "entitlement activated"
                        );
                        Ok(Outcome::Activated(activation))
                    }
                    ActivationResult::AlreadyApplied => {
                        tracing::info!(
                            provider = %event.provider,
                            external_id = %event.external_id,
                            intent_id = %intent.id,
                            "lost activation race, already applied"
                        );
                        Ok(Outcome::AlreadyProcessed)
                    }
                },
                GuardDecision::AmountMismatch {
                    intent_cents,
                    event_cents,
                } => {
                    tracing::warn!(
                        provider = %event.provider,
                        external_id = %event.external_id,
                        intent_id = %intent.id,
                        intent_cents,
                        event_cents,
                        "amount mismatch, refusing to activate"
                    );
                    Ok(Outcome::AmountMismatch)
                }
                decision => {
                    tracing::info!(
                        provider = %event.provider,
                        external_id = %event.external_id,
                        intent_id = %intent.id,
                        ?decision,
                        "duplicate delivery, no action"
                    );
                    Ok(Outcome::AlreadyProcessed)
                }
            }
        }
    }
}
