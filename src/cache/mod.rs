//! Two-tier cache for resolved media records.
//!
//! The RAM tier is a process-local [`DashMap`]; the persistent tier is the
//! `media_records` table. Lookups go RAM first (no I/O), then SQLite,
//! populating RAM on the way back. Stores write SQLite first, so a crash
//! between the two writes leaves the durable tier authoritative and the
//! RAM tier is simply rebuilt from it.

use dashmap::DashMap;
use tunevault_common::Result;
use tunevault_db::models::MediaRecord;
use tunevault_db::pool::{get_conn, DbPool};
use tunevault_db::queries::media_records;

/// Two-tier cache: an in-process map over the durable document store.
pub struct MediaCache {
    ram: DashMap<String, MediaRecord>,
    pool: DbPool,
}

impl MediaCache {
    /// Create a cache with an empty RAM tier over the given pool.
    pub fn new(pool: DbPool) -> Self {
        Self {
            ram: DashMap::new(),
            pool,
        }
    }

    /// Look up a resolved record by canonical identifier.
    ///
    /// On a persistent-tier hit the record's access counter is bumped and
    /// the RAM tier is populated before returning. RAM-tier hits do no I/O.
    pub fn lookup(&self, media_id: &str) -> Result<Option<MediaRecord>> {
        if let Some(record) = self.ram.get(media_id) {
            return Ok(Some(record.clone()));
        }

        let conn = get_conn(&self.pool)?;
        match media_records::find_by_media_id(&conn, media_id)? {
            Some(record) => {
                media_records::bump_access(&conn, media_id)?;
                self.ram.insert(media_id.to_string(), record.clone());
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Persist a resolved record, then mirror it into the RAM tier.
    pub fn store(&self, record: &MediaRecord) -> Result<()> {
        let conn = get_conn(&self.pool)?;
        media_records::upsert_record(&conn, record)?;
        self.ram.insert(record.media_id.clone(), record.clone());
        Ok(())
    }

    /// Warm the RAM tier with the `top_k` most-accessed records.
    ///
    /// Returns the number of records loaded. Callers treat failure as
    /// non-fatal: the process runs with a cold RAM tier and degrades to
    /// persistent-tier lookups.
    pub fn preload(&self, top_k: usize) -> Result<usize> {
        let conn = get_conn(&self.pool)?;
        let records = media_records::find_top_by_access(&conn, top_k)?;
        let count = records.len();
        for record in records {
            self.ram.insert(record.media_id.clone(), record);
        }
        Ok(count)
    }

    /// Number of resolved records in the persistent tier.
    pub fn resolved_count(&self) -> Result<i64> {
        let conn = get_conn(&self.pool)?;
        media_records::count_records(&conn)
    }

    /// Number of records currently held in the RAM tier.
    pub fn ram_len(&self) -> usize {
        self.ram.len()
    }
}
