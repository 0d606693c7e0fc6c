use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};

use crate::payments::pushinpay;
use crate::db::AppState;
use crate::reconcile;

use super::outcome_response;

/// PushinPay delivers the same payload as JSON or form-encoded depending on
/// account configuration; the adapter branches on content-type. Test/noise
/// events (no payer identification, non-positive amount) short-circuit with
/// a no-op 200.
pub async fn handle_pushinpay_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let content_type = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok());

    let webhook = match pushinpay::parse_webhook(content_type, &body) {
        Ok(w) => w,
        Err(e) => {
            tracing::error!("Failed to parse PushinPay webhook: {}", e);
            return (StatusCode::BAD_REQUEST, "Invalid payload");
        }
    };

    if webhook.is_noise() {
        tracing::info!(
            transaction_id = %webhook.id,
            value = webhook.value,
            "PushinPay test/noise event, ignoring"
        );
        return (StatusCode::OK, "Test event ignored");
    }

    let event = pushinpay::normalize_webhook(&webhook);

    match reconcile::process_event(&state.db, &state.pricing, &event) {
        Ok(outcome) => outcome_response(&outcome),
        Err(e) => {
            tracing::error!("Failed to process PushinPay event: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Processing error")
        }
    }
}
