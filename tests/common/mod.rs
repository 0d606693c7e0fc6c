//! Shared test fixtures and helpers.

#![allow(dead_code)]

use std::sync::Arc;

use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

use paygate::db::{self, queries, AppState, DbPool};
use paygate::models::{CreatePaymentIntent, CreateUser, PaymentIntent, User};
use paygate::payments::{
    EventStatus, MercadoPagoConfig, PaymentEvent, PaymentProvider, ProviderSettings,
    PushinPayConfig, StripeConfig,
};
use paygate::plans::{PlanKind, PlanPricing};

pub const TEST_STRIPE_WEBHOOK_SECRET: &str = "whsec_test123secret456";

pub fn test_providers() -> ProviderSettings {
    ProviderSettings {
        mercadopago: Some(MercadoPagoConfig {
            access_token: "TEST-mp-token".to_string(),
            notification_url: None,
        }),
        pushinpay: Some(PushinPayConfig {
            token: "test-pp-token".to_string(),
            webhook_url: None,
        }),
        stripe: Some(StripeConfig {
            secret_key: "sk_test_xxx".to_string(),
            webhook_secret: TEST_STRIPE_WEBHOOK_SECRET.to_string(),
        }),
        default_provider: None,
    }
}

fn state_from_pool(pool: DbPool) -> AppState {
    db::init_db(&pool.get().unwrap()).unwrap();
    AppState {
        db: pool,
        providers: Arc::new(test_providers()),
        pricing: Arc::new(PlanPricing::default()),
        base_url: "http://localhost:3000".to_string(),
    }
}

/// Single-connection in-memory state. Scope any `state.db.get()` handle so
/// it is dropped before driving a handler, or the pool will starve.
pub fn create_test_app_state() -> AppState {
    let manager = SqliteConnectionManager::memory();
    let pool = r2d2::Pool::builder().max_size(1).build(manager).unwrap();
    state_from_pool(pool)
}

/// File-backed state sharing one database across pool connections; required
/// by the concurrency tests. Keep the TempDir alive for the test's duration.
pub fn create_shared_test_state(dir: &tempfile::TempDir) -> AppState {
    let path = dir.path().join("paygate-test.db");
    let pool = db::create_pool(path.to_str().unwrap()).unwrap();
    state_from_pool(pool)
}

pub fn create_test_user(conn: &Connection, email: &str) -> User {
    queries::create_user(
        conn,
        &CreateUser {
            email: email.to_string(),
            name: None,
        },
    )
    .unwrap()
}

pub fn create_test_intent(
    conn: &Connection,
    user_id: &str,
    plan: PlanKind,
    amount_cents: i64,
    provider: PaymentProvider,
    provider_payment_id: Option<&str>,
    provider_ref: Option<&str>,
) -> PaymentIntent {
    queries::create_intent(
        conn,
        &CreatePaymentIntent {
            user_id: user_id.to_string(),
            plan,
            amount_cents,
            provider,
            provider_payment_id: provider_payment_id.map(String::from),
            provider_ref: provider_ref.map(String::from),
        },
    )
    .unwrap()
}

pub fn approved_event(
    provider: PaymentProvider,
    external_id: &str,
    amount_cents: i64,
) -> PaymentEvent {
    PaymentEvent {
        provider,
        external_id: external_id.to_string(),
        amount_cents,
        status: EventStatus::Approved,
        payer_email: None,
        correlation_ref: None,
    }
}

pub fn fetch_user(state: &AppState, id: &str) -> User {
    let conn = state.db.get().unwrap();
    queries::get_user_by_id(&conn, id).unwrap().unwrap()
}

pub fn fetch_intent(state: &AppState, id: &str) -> PaymentIntent {
    let conn = state.db.get().unwrap();
    queries::get_intent_by_id(&conn, id).unwrap().unwrap()
}

pub fn ledger_count(state: &AppState) -> i64 {
    let conn = state.db.get().unwrap();
    conn.query_row("SELECT COUNT(*) FROM ledger", [], |row| row.get(0))
        .unwrap()
}

/// Backdate an intent so most-recently-updated tie-breaks are deterministic.
pub fn set_intent_updated_at(state: &AppState, intent_id: &str, updated_at: i64) {
    let conn = state.db.get().unwrap();
    conn.execute(
        "UPDATE payment_intents SET updated_at = ?1 WHERE id = ?2",
        rusqlite::params![updated_at, intent_id],
    )
    .unwrap();
}

/// Compute a valid `stripe-signature` header for a payload.
pub fn stripe_signature_header(payload: &[u8], secret: &str) -> String {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    type HmacSha256 = Hmac<Sha256>;

    let timestamp = chrono::Utc::now().timestamp().to_string();
    let signed_payload = format!("{}.{}", timestamp, String::from_utf8_lossy(payload));
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(signed_payload.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());
    format!("t={},v1={}", timestamp, signature)
}
