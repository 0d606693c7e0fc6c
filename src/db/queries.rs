use chrono::Utc;
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;
use crate::payments::PaymentProvider;
use crate::plans::PlanKind;

use super::from_row::{query_all, query_one, INTENT_COLS, LEDGER_COLS, USER_COLS};

fn now() -> i64 {
    Utc::now().timestamp()
}

fn gen_id() -> String {
    Uuid::new_v4().to_string()
}

// ============ Users ============

pub fn create_user(conn: &Connection, input: &CreateUser) -> Result<User> {
    let id = gen_id();
    let now = now();
    let email = input.email.trim().to_lowercase();

    conn.execute(
        "INSERT INTO users (id, email, name, premium, created_at, updated_at)
         VALUES (?1, ?2, ?3, 0, ?4, ?5)",
        params![&id, &email, &input.name, now, now],
    )?;

    Ok(User {
        id,
        email,
        name: input.name.clone(),
        premium: false,
        payment_status: None,
        payment_date: None,
        expire_date: None,
        created_at: now,
        updated_at: now,
    })
}

pub fn get_user_by_id(conn: &Connection, id: &str) -> Result<Option<User>> {
    query_one(
        conn,
        &format!("SELECT {} FROM users WHERE id = ?1", USER_COLS),
        params![id],
    )
}

/// Emails are normalized to lowercase on write, so lookups normalize too.
pub fn get_user_by_email(conn: &Connection, email: &str) -> Result<Option<User>> {
    query_one(
        conn,
        &format!("SELECT {} FROM users WHERE email = ?1", USER_COLS),
        params![email.trim().to_lowercase()],
    )
}

pub fn get_or_create_user_by_email(conn: &Connection, email: &str) -> Result<User> {
    if let Some(user) = get_user_by_email(conn, email)? {
        return Ok(user);
    }
    create_user(
        conn,
        &CreateUser {
            email: email.to_string(),
            name: None,
        },
    )
}

/// Flip the user's premium entitlement. Only the entitlement activator may
/// call this, and only inside its transaction.
pub fn grant_entitlement(
    conn: &Connection,
    user_id: &str,
    paid_at: i64,
    expire_date: i64,
) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE users
         SET premium = 1, payment_status = 'paid', payment_date = ?1,
             expire_date = ?2, updated_at = ?3
         WHERE id = ?4",
        params![paid_at, expire_date, now(), user_id],
    )?;
    Ok(affected > 0)
}

// ============ Payment Intents ============

pub fn create_intent(conn: &Connection, input: &CreatePaymentIntent) -> Result<PaymentIntent> {
    let id = gen_id();
    let now = now();

    conn.execute(
        "INSERT INTO payment_intents
         (id, user_id, plan, amount_cents, status, provider, provider_payment_id, provider_ref,
          created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, 'pending', ?5, ?6, ?7, ?8, ?9)",
        params![
            &id,
            &input.user_id,
            input.plan.as_ref(),
            input.amount_cents,
            input.provider.as_str(),
            &input.provider_payment_id,
            &input.provider_ref,
            now,
            now
        ],
    )?;

    Ok(PaymentIntent {
        id,
        user_id: input.user_id.clone(),
        plan: input.plan,
        amount_cents: input.amount_cents,
        status: IntentStatus::Pending,
        provider: input.provider,
        provider_payment_id: input.provider_payment_id.clone(),
        provider_ref: input.provider_ref.clone(),
        created_at: now,
        updated_at: now,
    })
}

pub fn get_intent_by_id(conn: &Connection, id: &str) -> Result<Option<PaymentIntent>> {
    query_one(
        conn,
        &format!("SELECT {} FROM payment_intents WHERE id = ?1", INTENT_COLS),
        params![id],
    )
}

/// Find an intent already carrying this provider transaction id. When
/// several match, the most recently updated one is authoritative.
pub fn find_intent_by_provider_payment_id(
    conn: &Connection,
    provider: PaymentProvider,
    provider_payment_id: &str,
) -> Result<Option<PaymentIntent>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM payment_intents
             WHERE provider = ?1 AND provider_payment_id = ?2
             ORDER BY updated_at DESC, created_at DESC
             LIMIT 1",
            INTENT_COLS
        ),
        params![provider.as_str(), provider_payment_id],
    )
}

/// Most recent pending intent for a user whose amount matches within the
/// tolerance. Backs the Stripe landing-page flow, where the webhook carries
/// only an email.
pub fn find_pending_intent_for_user_amount(
    conn: &Connection,
    user_id: &str,
    amount_cents: i64,
    tolerance_cents: i64,
) -> Result<Option<PaymentIntent>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM payment_intents
             WHERE user_id = ?1 AND status = 'pending'
               AND amount_cents BETWEEN ?2 AND ?3
             ORDER BY updated_at DESC, created_at DESC
             LIMIT 1",
            INTENT_COLS
        ),
        params![
            user_id,
            amount_cents - tolerance_cents,
            amount_cents + tolerance_cents
        ],
    )
}

/// Record the provider's transaction id and correlation ref on a freshly
/// created intent, once the provider has accepted the charge.
pub fn attach_provider_charge(
    conn: &Connection,
    intent_id: &str,
    provider_payment_id: Option<&str>,
    provider_ref: Option<&str>,
) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE payment_intents
         SET provider_payment_id = ?1, provider_ref = ?2, updated_at = ?3
         WHERE id = ?4",
        params![provider_payment_id, provider_ref, now(), intent_id],
    )?;
    Ok(affected > 0)
}

/// Stamp the provider's transaction id on an intent once the provider first
/// reports it (keeps the provider-id lookup strategy viable on redelivery).
pub fn set_intent_provider_payment_id(
    conn: &Connection,
    intent_id: &str,
    provider_payment_id: &str,
) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE payment_intents
         SET provider_payment_id = ?1, updated_at = ?2
         WHERE id = ?3 AND provider_payment_id IS NULL",
        params![provider_payment_id, now(), intent_id],
    )?;
    Ok(affected > 0)
}

/// Atomically claim the paid transition.
///
/// The conditional on `status = 'pending'` is the whole concurrency story:
/// of two racing deliveries exactly one sees a row change, the other
/// observes `false` and treats the event as already applied. It also refuses
/// to promote an intent that already reached a terminal failure.
pub fn try_mark_intent_paid(conn: &Connection, intent_id: &str) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE payment_intents
         SET status = 'paid', updated_at = ?1
         WHERE id = ?2 AND status = 'pending'",
        params![now(), intent_id],
    )?;
    Ok(affected > 0)
}

/// Move a pending intent to a terminal failure state. `paid` is monotonic:
/// the conditional keeps a late rejection from demoting a settled intent.
pub fn try_mark_intent_terminal(
    conn: &Connection,
    intent_id: &str,
    status: IntentStatus,
) -> Result<bool> {
    debug_assert!(matches!(
        status,
        IntentStatus::Failed | IntentStatus::Cancelled
    ));
    let affected = conn.execute(
        "UPDATE payment_intents
         SET status = ?1, updated_at = ?2
         WHERE id = ?3 AND status = 'pending'",
        params![status.as_ref(), now(), intent_id],
    )?;
    Ok(affected > 0)
}

// ============ Ledger ============

/// Insert a ledger row, returning `None` when the
/// `(provider, provider_payment_id)` uniqueness constraint rejects it.
/// That is the duplicate-delivery signal, not an error.
pub fn try_insert_ledger_entry(
    conn: &Connection,
    input: &CreateLedgerEntry,
) -> Result<Option<LedgerEntry>> {
    let id = gen_id();
    let created_at = now();

    let result = conn.execute(
        "INSERT INTO ledger
         (id, provider, provider_payment_id, user_id, plan, amount_cents, status, paid_at,
          created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'paid', ?7, ?8)",
        params![
            &id,
            input.provider.as_str(),
            &input.provider_payment_id,
            &input.user_id,
            input.plan.as_ref(),
            input.amount_cents,
            input.paid_at,
            created_at
        ],
    );

    match result {
        Ok(_) => Ok(Some(LedgerEntry {
            id,
            provider: input.provider,
            provider_payment_id: input.provider_payment_id.clone(),
            user_id: input.user_id.clone(),
            plan: input.plan,
            amount_cents: input.amount_cents,
            status: "paid".to_string(),
            paid_at: input.paid_at,
            created_at,
        })),
        Err(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

pub fn ledger_entry_exists(
    conn: &Connection,
    provider: PaymentProvider,
    provider_payment_id: &str,
) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM ledger WHERE provider = ?1 AND provider_payment_id = ?2",
        params![provider.as_str(), provider_payment_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Heuristic dedup for providers that omit a stable id on retry: an id-less
/// paid row for the same user, plan and amount inside the window counts as
/// the same charge.
pub fn ledger_entry_in_window(
    conn: &Connection,
    user_id: &str,
    plan: PlanKind,
    amount_cents: i64,
    around: i64,
    window_seconds: i64,
) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM ledger
         WHERE user_id = ?1 AND plan = ?2 AND amount_cents = ?3 AND status = 'paid'
           AND provider_payment_id IS NULL
           AND paid_at BETWEEN ?4 AND ?5",
        params![
            user_id,
            plan.as_ref(),
            amount_cents,
            around - window_seconds,
            around + window_seconds
        ],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn list_ledger_entries_for_user(conn: &Connection, user_id: &str) -> Result<Vec<LedgerEntry>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM ledger WHERE user_id = ?1 ORDER BY paid_at DESC",
            LEDGER_COLS
        ),
        params![user_id],
    )
}
