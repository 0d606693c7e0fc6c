mod mercadopago;
mod pushinpay;
mod stripe;

pub use mercadopago::*;
pub use pushinpay::*;
pub use stripe::*;

use axum::{http::StatusCode, routing::post, Router};

use crate::db::AppState;
use crate::reconcile::Outcome;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/webhook/mercadopago", post(handle_mercadopago_webhook))
        .route("/webhook/pushinpay", post(handle_pushinpay_webhook))
        .route("/webhook/stripe", post(handle_stripe_webhook))
}

/// Providers treat any non-2xx as "redeliver", so every understood outcome,
/// including the ones where we intentionally did nothing, answers 200.
pub(crate) fn outcome_response(outcome: &Outcome) -> (StatusCode, &'static str) {
    match outcome {
        Outcome::Activated(_) => (StatusCode::OK, "Activated"),
        Outcome::AlreadyProcessed => (StatusCode::OK, "Already processed"),
        Outcome::NoMatch => (StatusCode::OK, "No matching intent"),
        Outcome::AmountMismatch => (StatusCode::OK, "Amount mismatch"),
        Outcome::MarkedFailed => (StatusCode::OK, "Marked failed"),
        Outcome::IgnoredPending => (StatusCode::OK, "Payment pending"),
    }
}
