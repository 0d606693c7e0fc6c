//! Resolution of a canonical payment event to a payment intent.
//!
//! Strategies form an ordered fallback chain; the first hit wins. Each
//! strategy is an independent pure function over `(connection, event)` so it
//! can be tested on its own. The final email-fallback is the one path that
//! creates an intent instead of finding one, and only MercadoPago events are
//! allowed to take it.

use rusqlite::Connection;
use uuid::Uuid;

use crate::db::queries;
use crate::error::Result;
use crate::models::{CreatePaymentIntent, PaymentIntent};
use crate::payments::{EventStatus, PaymentEvent, PaymentProvider};
use crate::plans::{PlanPricing, AMOUNT_TOLERANCE_CENTS};

#[derive(Debug)]
pub enum MatchOutcome {
    /// An existing intent was found by the named strategy.
    Matched {
        intent: PaymentIntent,
        strategy: &'static str,
    },
    /// No intent existed; one was synthesized from the payer email
    /// (MercadoPago only).
    Created(PaymentIntent),
    /// Expected for noise/test webhooks; logged and dropped, never an error.
    NotFound,
}

type Strategy = fn(&Connection, &PaymentEvent) -> Result<Option<PaymentIntent>>;

const STRATEGIES: &[(&'static str, Strategy)] = &[
    ("composite-ref", by_composite_ref),
    ("bare-ref", by_bare_ref),
    ("provider-payment-id", by_provider_payment_id),
    ("payer-email-pending", by_payer_email_pending),
];

pub fn resolve(
    conn: &Connection,
    event: &PaymentEvent,
    pricing: &PlanPricing,
) -> Result<MatchOutcome> {
    for &(name, strategy) in STRATEGIES {
        if let Some(intent) = strategy(conn, event)? {
            tracing::debug!(
                provider = %event.provider,
                external_id = %event.external_id,
                strategy = name,
                intent_id = %intent.id,
                "event matched"
            );
            return Ok(MatchOutcome::Matched {
                intent,
                strategy: name,
            });
        }
    }

    // Synthesis is reserved for settled MercadoPago charges whose session
    // linkage was lost; a pending or rejected event must never create state.
    if event.provider == PaymentProvider::MercadoPago
        && event.status == EventStatus::Approved
    {
        if let Some(email) = event.payer_email.as_deref() {
            if let Some(intent) = synthesize_from_email(conn, event, email, pricing)? {
                return Ok(MatchOutcome::Created(intent));
            }
        }
    }

    Ok(MatchOutcome::NotFound)
}

/// Normalize any UUID spelling (case, braces) to the canonical lowercase
/// hyphenated form intents are keyed by. Returns None for anything that is
/// not a well-formed identifier; malformed input must not reach a query.
fn well_formed_id(raw: &str) -> Option<String> {
    Uuid::try_parse(raw.trim())
        .ok()
        .map(|u| u.hyphenated().to_string())
}

/// Composite correlation ref `{user_id}_{plan}_{intent_id}`: the trailing
/// segment is the intent primary key.
fn by_composite_ref(conn: &Connection, event: &PaymentEvent) -> Result<Option<PaymentIntent>> {
    let Some(ref raw) = event.correlation_ref else {
        return Ok(None);
    };
    if !raw.contains('_') {
        return Ok(None);
    }
    let Some(tail) = raw.rsplit('_').next() else {
        return Ok(None);
    };
    let Some(id) = well_formed_id(tail) else {
        return Ok(None);
    };
    queries::get_intent_by_id(conn, &id)
}

/// Legacy refs carry the intent id directly.
fn by_bare_ref(conn: &Connection, event: &PaymentEvent) -> Result<Option<PaymentIntent>> {
    let Some(ref raw) = event.correlation_ref else {
        return Ok(None);
    };
    let Some(id) = well_formed_id(raw) else {
        return Ok(None);
    };
    queries::get_intent_by_id(conn, &id)
}

/// The intent may already carry the provider's transaction id from checkout
/// creation even when the correlation ref failed to parse.
fn by_provider_payment_id(
    conn: &Connection,
    event: &PaymentEvent,
) -> Result<Option<PaymentIntent>> {
    if event.external_id.is_empty() {
        return Ok(None);
    }
    queries::find_intent_by_provider_payment_id(conn, event.provider, &event.external_id)
}

/// Stripe landing-page flow: metadata carries only an email, so the match is
/// the payer's most recent pending intent with the same amount.
fn by_payer_email_pending(
    conn: &Connection,
    event: &PaymentEvent,
) -> Result<Option<PaymentIntent>> {
    if event.provider != PaymentProvider::Stripe || event.correlation_ref.is_some() {
        return Ok(None);
    }
    let Some(email) = event.payer_email.as_deref() else {
        return Ok(None);
    };
    let Some(user) = queries::get_user_by_email(conn, email)? else {
        return Ok(None);
    };
    queries::find_pending_intent_for_user_amount(
        conn,
        &user.id,
        event.amount_cents,
        AMOUNT_TOLERANCE_CENTS,
    )
}

/// MercadoPago email-fallback: the payer is a known user but no intent
/// survived. Synthesize a pending intent with the plan inferred from the
/// charged amount so the payment is not lost.
fn synthesize_from_email(
    conn: &Connection,
    event: &PaymentEvent,
    email: &str,
    pricing: &PlanPricing,
) -> Result<Option<PaymentIntent>> {
    let Some(user) = queries::get_user_by_email(conn, email)? else {
        tracing::info!(
            provider = %event.provider,
            external_id = %event.external_id,
            "email fallback: no user for payer email, dropping event"
        );
        return Ok(None);
    };

    let plan = pricing.infer_plan(event.amount_cents);
    if (pricing.price_cents(plan) - event.amount_cents).abs() > AMOUNT_TOLERANCE_CENTS {
        tracing::warn!(
            external_id = %event.external_id,
            amount_cents = event.amount_cents,
            inferred = %plan,
            "charged amount matches no configured plan, defaulting conservatively"
        );
    }
    tracing::warn!(
        provider = %event.provider,
        external_id = %event.external_id,
        user_id = %user.id,
        plan = %plan,
        amount_cents = event.amount_cents,
        "email fallback: synthesizing intent for unlinked payment"
    );

    let intent = queries::create_intent(
        conn,
        &CreatePaymentIntent {
            user_id: user.id,
            plan,
            amount_cents: event.amount_cents,
            provider: event.provider,
            provider_payment_id: Some(event.external_id.clone()),
            provider_ref: event.correlation_ref.clone(),
        },
    )?;
    Ok(Some(intent))
}
