//! API key ledger queries.
//!
//! The ledger maps a key to a usage counter with an active flag, an
//! optional expiry, and a daily limit that resets when the calendar day
//! changes. Verification and usage accounting happen in one call so the
//! resolve path makes a single ledger round trip.

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tunevault_common::{Error, Result};

use crate::models::ApiKey;

/// Parse an API key from a database row.
///
/// Expects columns in order: key, active, daily_limit, used_today,
/// last_reset, expires_at, created_at.
fn parse_key_row(row: &rusqlite::Row) -> rusqlite::Result<ApiKey> {
    Ok(ApiKey {
        key: row.get(0)?,
        active: row.get::<_, i64>(1)? != 0,
        daily_limit: row.get(2)?,
        used_today: row.get(3)?,
        last_reset: row.get(4)?,
        expires_at: row
            .get::<_, Option<String>>(5)?
            .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
            .map(|dt| dt.with_timezone(&Utc)),
        created_at: DateTime::parse_from_rfc3339(&row.get::<_, String>(6)?)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    })
}

/// Insert a new API key.
pub fn insert_key(conn: &Connection, key: &ApiKey) -> Result<()> {
    conn.execute(
        "INSERT INTO api_keys (key, active, daily_limit, used_today, last_reset, expires_at, created_at)
         VALUES (:key, :active, :daily_limit, :used_today, :last_reset, :expires_at, :created_at)",
        rusqlite::named_params! {
            ":key": &key.key,
            ":active": key.active as i64,
            ":daily_limit": key.daily_limit,
            ":used_today": key.used_today,
            ":last_reset": &key.last_reset,
            ":expires_at": key.expires_at.map(|dt| dt.to_rfc3339()),
            ":created_at": key.created_at.to_rfc3339(),
        },
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(())
}

/// Find an API key by its literal value.
pub fn find_key(conn: &Connection, key: &str) -> Result<Option<ApiKey>> {
    let result = conn.query_row(
        "SELECT key, active, daily_limit, used_today, last_reset, expires_at, created_at
         FROM api_keys WHERE key = :key",
        rusqlite::named_params! { ":key": key },
        parse_key_row,
    );

    match result {
        Ok(key) => Ok(Some(key)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// Verify a key and consume one unit of its daily quota.
///
/// Returns `Ok(false)` for unknown, inactive, expired, or over-limit keys.
/// When the calendar day has changed since the last use, the daily counter
/// resets before the limit check. A `true` verdict has already incremented
/// the usage counter.
pub fn verify_and_consume(conn: &Connection, raw_key: &str, now: DateTime<Utc>) -> Result<bool> {
    let record = match find_key(conn, raw_key)? {
        Some(record) => record,
        None => return Ok(false),
    };

    if !record.active {
        return Ok(false);
    }

    if let Some(expires_at) = record.expires_at {
        if now > expires_at {
            return Ok(false);
        }
    }

    let today = now.date_naive().to_string();
    let used_today = if record.last_reset.as_deref() == Some(today.as_str()) {
        record.used_today
    } else {
        conn.execute(
            "UPDATE api_keys SET used_today = 0, last_reset = :today WHERE key = :key",
            rusqlite::named_params! { ":today": &today, ":key": raw_key },
        )
        .map_err(|e| Error::database(e.to_string()))?;
        0
    };

    if used_today >= record.daily_limit {
        return Ok(false);
    }

    conn.execute(
        "UPDATE api_keys SET used_today = used_today + 1 WHERE key = :key",
        rusqlite::named_params! { ":key": raw_key },
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(true)
}
