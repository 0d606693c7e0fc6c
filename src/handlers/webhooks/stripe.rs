use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};

use crate::db::AppState;
use crate::payments::{normalize_checkout_session, StripeCheckoutSession, StripeClient, StripeWebhookEvent};
use crate::reconcile;

use super::outcome_response;

/// Stripe events are cryptographically signed; the signature is verified
/// against the raw body before any field is trusted and before any database
/// access occurs.
pub async fn handle_stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let signature = match headers.get("stripe-signature") {
        Some(sig) => match sig.to_str() {
            Ok(s) => s.to_string(),
            Err(_) => return (StatusCode::BAD_REQUEST, "Invalid signature header"),
        },
        None => return (StatusCode::BAD_REQUEST, "Missing stripe-signature header"),
    };

    let config = match &state.providers.stripe {
        Some(c) => c,
        None => return (StatusCode::OK, "Stripe not configured"),
    };

    let client = StripeClient::new(config);
    match client.verify_webhook_signature(&body, &signature) {
        Ok(true) => {}
        Ok(false) => return (StatusCode::UNAUTHORIZED, "Invalid signature"),
        Err(e) => {
            tracing::error!("Signature verification error: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Signature verification failed");
        }
    }

    let event: StripeWebhookEvent = match serde_json::from_slice(&body) {
        Ok(e) => e,
        Err(e) => {
            tracing::error!("Failed to parse Stripe webhook: {}", e);
            return (StatusCode::BAD_REQUEST, "Invalid JSON");
        }
    };

    if event.event_type != "checkout.session.completed" {
        return (StatusCode::OK, "Event ignored");
    }

    let session: StripeCheckoutSession = match serde_json::from_value(event.data.object) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to parse checkout session: {}", e);
            return (StatusCode::BAD_REQUEST, "Invalid checkout session");
        }
    };

    let event = normalize_checkout_session(&session);

    match reconcile::process_event(&state.db, &state.pricing, &event) {
        Ok(outcome) => outcome_response(&outcome),
        Err(e) => {
            tracing::error!("Failed to process Stripe event: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Processing error")
        }
    }
}
