//! Application error type and HTTP mapping.
//!
//! Webhook endpoints deliberately keep two lanes: anything a provider should
//! retry (provider API failures, database errors) maps to 5xx, anything we
//! understood but rejected (bad payload, bad signature) maps to 4xx.
//! "Understood but not actionable" outcomes are not errors at all; they are
//! `reconcile::Outcome` variants and always answer 200.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// Request body could not be parsed as the provider's wire format.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// Webhook signature missing or failed verification (Stripe).
    #[error("invalid webhook signature")]
    SignatureInvalid,

    /// A provider API call failed; the provider should redeliver the webhook.
    #[error("provider API error ({provider}): {message}")]
    ProviderApi {
        provider: &'static str,
        message: String,
    },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::MalformedPayload(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::SignatureInvalid => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ProviderApi { .. } => StatusCode::BAD_GATEWAY,
            AppError::Database(_) | AppError::Pool(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{}", self);
        }
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
