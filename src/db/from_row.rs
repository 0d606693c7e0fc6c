//! Row-mapping helpers shared by the query layer.
//!
//! Each model gets a `*_COLS` constant naming its columns in the order its
//! `FromRow` impl reads them; queries interpolate the constant so SELECT
//! lists and mappers cannot drift apart.

use rusqlite::{types::Type, Connection, Params, Row};

use crate::error::Result;
use crate::models::{LedgerEntry, PaymentIntent, User};

pub trait FromRow: Sized {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

pub const USER_COLS: &str =
    "id, email, name, premium, payment_status, payment_date, expire_date, created_at, updated_at";

pub const INTENT_COLS: &str = "id, user_id, plan, amount_cents, status, provider, \
     provider_payment_id, provider_ref, created_at, updated_at";

pub const LEDGER_COLS: &str =
    "id, provider, provider_payment_id, user_id, plan, amount_cents, status, paid_at, created_at";

/// Map a stored string column through `FromStr`, surfacing a conversion
/// failure instead of panicking on corrupt data.
fn parse_text<T>(idx: usize, value: String) -> rusqlite::Result<T>
where
    T: std::str::FromStr,
{
    value.parse().map_err(|_| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("unrecognized stored value: {}", value).into(),
        )
    })
}

impl FromRow for User {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(User {
            id: row.get(0)?,
            email: row.get(1)?,
            name: row.get(2)?,
            premium: row.get(3)?,
            payment_status: row.get(4)?,
            payment_date: row.get(5)?,
            expire_date: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }
}

impl FromRow for PaymentIntent {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(PaymentIntent {
            id: row.get(0)?,
            user_id: row.get(1)?,
            plan: parse_text(2, row.get::<_, String>(2)?)?,
            amount_cents: row.get(3)?,
            status: parse_text(4, row.get::<_, String>(4)?)?,
            provider: parse_text(5, row.get::<_, String>(5)?)?,
            provider_payment_id: row.get(6)?,
            provider_ref: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }
}

impl FromRow for LedgerEntry {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(LedgerEntry {
            id: row.get(0)?,
            provider: parse_text(1, row.get::<_, String>(1)?)?,
            provider_payment_id: row.get(2)?,
            user_id: row.get(3)?,
            plan: parse_text(4, row.get::<_, String>(4)?)?,
            amount_cents: row.get(5)?,
            status: row.get(6)?,
            paid_at: row.get(7)?,
            created_at: row.get(8)?,
        })
    }
}

pub fn query_one<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: impl Params,
) -> Result<Option<T>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query_map(params, |row| T::from_row(row))?;
    match rows.next() {
        Some(row) => Ok(Some(row?)),
        None => Ok(None),
    }
}

pub fn query_all<T: FromRow>(conn: &Connection, sql: &str, params: impl Params) -> Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, |row| T::from_row(row))?
        .collect::<rusqlite::Result<Vec<T>>>()?;
    Ok(rows)
}
