//! Internal Rust models matching the database schema.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A resolved media entry: the durable hosted link plus display metadata.
///
/// Records are created only after the relay produced a validated durable
/// link, so every persisted row is fully resolved. Once resolved a record
/// is never mutated except for its access counter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaRecord {
    /// Canonical platform identifier.
    pub media_id: String,
    pub title: String,
    /// Formatted duration (`M:SS` / `H:MM:SS`) or `"unknown"`.
    pub duration: String,
    /// Publicly fetchable link on the durable host.
    pub durable_link: String,
    pub thumbnail: Option<String>,
    pub cached_at: DateTime<Utc>,
    /// Persistent-tier hit counter; ranking signal for cache preloading.
    pub access_count: i64,
}

/// API key ledger row: a usage counter with active/expiry flags.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiKey {
    pub key: String,
    pub active: bool,
    /// Requests allowed per calendar day.
    pub daily_limit: i64,
    pub used_today: i64,
    /// ISO date (`YYYY-MM-DD`) of the last daily-counter reset.
    pub last_reset: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
