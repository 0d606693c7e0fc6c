use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};

use crate::db::AppState;
use crate::payments::{normalize_payment, MercadoPagoClient, MercadoPagoWebhook};
use crate::reconcile;

use super::outcome_response;

/// MercadoPago notifications carry only an action and a payment id; the
/// authoritative amount/status/payer come from a secondary lookup. A lookup
/// failure answers 5xx so MercadoPago's own retry redelivers.
pub async fn handle_mercadopago_webhook(
    State(state): State<AppState>,
    body: Bytes,
) -> impl IntoResponse {
    let webhook: MercadoPagoWebhook = match serde_json::from_slice(&body) {
        Ok(w) => w,
        Err(e) => {
            tracing::error!("Failed to parse MercadoPago webhook: {}", e);
            return (StatusCode::BAD_REQUEST, "Invalid JSON");
        }
    };

    if !webhook.is_payment() {
        return (StatusCode::OK, "Event ignored");
    }

    let payment_id = match webhook.payment_id() {
        Some(id) => id,
        None => return (StatusCode::OK, "No payment id"),
    };

    let config = match &state.providers.mercadopago {
        Some(c) => c,
        None => return (StatusCode::OK, "MercadoPago not configured"),
    };

    let client = MercadoPagoClient::new(config);
    let payment = match client.get_payment(&payment_id).await {
        Ok(p) => p,
        Err(e) => {
            tracing::error!("MercadoPago payment lookup failed: {}", e);
            return (StatusCode::BAD_GATEWAY, "Payment lookup failed");
        }
    };

    let event = normalize_payment(&payment);

    match reconcile::process_event(&state.db, &state.pricing, &event) {
        Ok(outcome) => outcome_response(&outcome),
        Err(e) => {
            tracing::error!("Failed to process MercadoPago event: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Processing error")
        }
    }
}
