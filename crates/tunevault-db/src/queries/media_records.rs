//! Media record queries: the persistent tier of the multi-tier cache.
//!
//! Provides lookup, upsert, access-count bumping, and the top-K ranking
//! query used to warm the RAM tier at startup.

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tunevault_common::{Error, Result};

use crate::models::MediaRecord;

/// Parse a media record from a database row.
///
/// Expects columns in order: media_id, title, duration, durable_link,
/// thumbnail, cached_at, access_count.
fn parse_record_row(row: &rusqlite::Row) -> rusqlite::Result<MediaRecord> {
    Ok(MediaRecord {
        media_id: row.get(0)?,
        title: row.get(1)?,
        duration: row.get(2)?,
        durable_link: row.get(3)?,
        thumbnail: row.get(4)?,
        cached_at: DateTime::parse_from_rfc3339(&row.get::<_, String>(5)?)
            .unwrap()
            .with_timezone(&Utc),
        access_count: row.get(6)?,
    })
}

const RECORD_COLUMNS: &str =
    "media_id, title, duration, durable_link, thumbnail, cached_at, access_count";

/// Find a resolved record by its canonical identifier.
pub fn find_by_media_id(conn: &Connection, media_id: &str) -> Result<Option<MediaRecord>> {
    let result = conn.query_row(
        &format!("SELECT {RECORD_COLUMNS} FROM media_records WHERE media_id = :media_id"),
        rusqlite::named_params! { ":media_id": media_id },
        parse_record_row,
    );

    match result {
        Ok(record) => Ok(Some(record)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// Insert or overwrite a resolved record.
///
/// Re-storing the same identifier is an idempotent overwrite: the existing
/// access counter is preserved on conflict.
pub fn upsert_record(conn: &Connection, record: &MediaRecord) -> Result<()> {
    conn.execute(
        "INSERT INTO media_records
             (media_id, title, duration, durable_link, thumbnail, cached_at, access_count)
         VALUES (:media_id, :title, :duration, :durable_link, :thumbnail, :cached_at, :access_count)
         ON CONFLICT(media_id) DO UPDATE SET
             title = excluded.title,
             duration = excluded.duration,
             durable_link = excluded.durable_link,
             thumbnail = excluded.thumbnail,
             cached_at = excluded.cached_at",
        rusqlite::named_params! {
            ":media_id": &record.media_id,
            ":title": &record.title,
            ":duration": &record.duration,
            ":durable_link": &record.durable_link,
            ":thumbnail": &record.thumbnail,
            ":cached_at": record.cached_at.to_rfc3339(),
            ":access_count": record.access_count,
        },
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(())
}

/// Increment the access counter for a record.
pub fn bump_access(conn: &Connection, media_id: &str) -> Result<()> {
    conn.execute(
        "UPDATE media_records SET access_count = access_count + 1 WHERE media_id = :media_id",
        rusqlite::named_params! { ":media_id": media_id },
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(())
}

/// Fetch the `limit` most-accessed records, used to warm the RAM tier.
pub fn find_top_by_access(conn: &Connection, limit: usize) -> Result<Vec<MediaRecord>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM media_records
             ORDER BY access_count DESC, cached_at DESC
             LIMIT :limit"
        ))
        .map_err(|e| Error::database(e.to_string()))?;

    let records = stmt
        .query_map(
            rusqlite::named_params! { ":limit": limit as i64 },
            parse_record_row,
        )
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(records)
}

/// Count of resolved records in the persistent tier.
pub fn count_records(conn: &Connection) -> Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM media_records", [], |row| row.get(0))
        .map_err(|e| Error::database(e.to_string()))
}
