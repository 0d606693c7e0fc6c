pub mod from_row;
pub mod queries;

use std::sync::Arc;

use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

use crate::error::Result;
use crate::payments::ProviderSettings;
use crate::plans::PlanPricing;

pub type DbPool = r2d2::Pool<SqliteConnectionManager>;

/// Shared application state: connection pool plus configuration resolved
/// once at startup (provider credentials are injected, never re-read
/// mid-pipeline).
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub providers: Arc<ProviderSettings>,
    pub pricing: Arc<PlanPricing>,
    pub base_url: String,
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    name TEXT,
    premium INTEGER NOT NULL DEFAULT 0,
    payment_status TEXT,
    payment_date INTEGER,
    expire_date INTEGER,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS payment_intents (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES users(id),
    plan TEXT NOT NULL,
    amount_cents INTEGER NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    provider TEXT NOT NULL,
    provider_payment_id TEXT,
    provider_ref TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_intents_provider_payment
    ON payment_intents (provider, provider_payment_id);

CREATE INDEX IF NOT EXISTS idx_intents_user_status
    ON payment_intents (user_id, status, updated_at);

-- Append-only charge history. The uniqueness constraint is the hard
-- dedup line: a duplicate insert fails loudly and is treated as
-- 'already applied'. SQLite allows multiple NULL provider_payment_ids,
-- which is the wanted semantics for id-less providers.
CREATE TABLE IF NOT EXISTS ledger (
    id TEXT PRIMARY KEY,
    provider TEXT NOT NULL,
    provider_payment_id TEXT,
    user_id TEXT NOT NULL REFERENCES users(id),
    plan TEXT NOT NULL,
    amount_cents INTEGER NOT NULL,
    status TEXT NOT NULL DEFAULT 'paid',
    paid_at INTEGER NOT NULL,
    created_at INTEGER NOT NULL,
    UNIQUE (provider, provider_payment_id)
);

CREATE INDEX IF NOT EXISTS idx_ledger_dedup_window
    ON ledger (user_id, plan, amount_cents, paid_at);
";

/// Create the connection pool. WAL keeps concurrent webhook handlers from
/// serializing on reads; the busy timeout covers write contention between
/// racing deliveries.
pub fn create_pool(database_path: &str) -> Result<DbPool> {
    let manager = SqliteConnectionManager::file(database_path).with_init(|conn| {
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        Ok(())
    });
    Ok(r2d2::Pool::builder().build(manager)?)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}
