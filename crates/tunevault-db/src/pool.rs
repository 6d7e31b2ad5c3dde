//! Database connection pool management.
//!
//! This module provides connection pooling for SQLite using r2d2.
//! It handles pool initialization, connection customization, and running migrations.

use std::sync::atomic::{AtomicUsize, Ordering};

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::OpenFlags;
use tunevault_common::{Error, Result};

use crate::migrations;

/// Type alias for the database connection pool.
pub type DbPool = Pool<SqliteConnectionManager>;

/// Type alias for a pooled database connection.
pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Initialize a new database pool with the given file path.
///
/// This function will:
/// - Create the SQLite database file if it doesn't exist
/// - Set up connection pooling with r2d2
/// - Enable foreign key constraints on all connections
/// - Run pending database migrations
///
/// # Arguments
///
/// * `db_path` - Path to the SQLite database file
///
/// # Example
///
/// ```no_run
/// use tunevault_db::pool::init_pool;
///
/// let pool = init_pool("/var/lib/tunevault/tunevault.db").unwrap();
/// let conn = pool.get().unwrap();
/// ```
pub fn init_pool(db_path: &str) -> Result<DbPool> {
    let manager = SqliteConnectionManager::file(db_path).with_init(|conn| {
        // Enable foreign key constraints on each new connection
        conn.execute_batch("PRAGMA foreign_keys = ON;")
    });

    build_pool(manager)
}

/// Initialize an in-memory database pool for testing.
///
/// Every pool gets its own uniquely named shared-cache memory database, so
/// all pooled connections see the same schema and data while separate pools
/// in the same process stay isolated. The database is lost when the pool is
/// dropped.
///
/// # Example
///
/// ```
/// use tunevault_db::pool::init_memory_pool;
///
/// let pool = init_memory_pool().unwrap();
/// let conn = pool.get().unwrap();
/// ```
pub fn init_memory_pool() -> Result<DbPool> {
    static NEXT_DB: AtomicUsize = AtomicUsize::new(0);

    let name = format!(
        "file:tunevault_mem_{}?mode=memory&cache=shared",
        NEXT_DB.fetch_add(1, Ordering::Relaxed)
    );
    let manager = SqliteConnectionManager::file(name)
        .with_flags(
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI,
        )
        .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));

    build_pool(manager)
}

fn build_pool(manager: SqliteConnectionManager) -> Result<DbPool> {
    let pool = Pool::builder()
        .max_size(4)
        .build(manager)
        .map_err(|e| Error::database(format!("Failed to create connection pool: {}", e)))?;

    // Run migrations on a connection from the pool
    let conn = pool
        .get()
        .map_err(|e| Error::database(format!("Failed to get connection for migrations: {}", e)))?;

    migrations::run_migrations(&conn)
        .map_err(|e| Error::database(format!("Failed to run migrations: {}", e)))?;

    Ok(pool)
}

/// Get a connection from the pool.
///
/// This is a convenience wrapper around `pool.get()` that converts the
/// r2d2 error into our common Error type.
///
/// # Example
///
/// ```
/// use tunevault_db::pool::{init_memory_pool, get_conn};
///
/// let pool = init_memory_pool().unwrap();
/// let conn = get_conn(&pool).unwrap();
/// ```
pub fn get_conn(pool: &DbPool) -> Result<PooledConnection> {
    pool.get()
        .map_err(|e| Error::database(format!("Failed to get connection from pool: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_memory_pool() {
        let pool = init_memory_pool().unwrap();
        assert_eq!(pool.max_size(), 4);
    }

    #[test]
    fn test_get_conn() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();

        // Verify foreign keys are enabled
        let enabled: i32 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(enabled, 1);
    }

    #[test]
    fn test_migrations_run_on_init() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='media_records'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_pool_shares_one_database() {
        let pool = init_memory_pool().unwrap();

        {
            let conn = get_conn(&pool).unwrap();
            conn.execute(
                "INSERT INTO api_keys (key, active, daily_limit, used_today, created_at)
                 VALUES (?, 1, 100, 0, datetime('now'))",
                rusqlite::params!["test-key"],
            )
            .unwrap();
        }

        // Hold one connection so the next get() hands out a different one.
        let _held = get_conn(&pool).unwrap();
        let conn = get_conn(&pool).unwrap();
        let found: String = conn
            .query_row(
                "SELECT key FROM api_keys WHERE key = ?",
                ["test-key"],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(found, "test-key");
    }

    #[test]
    fn test_memory_pools_are_isolated() {
        let pool_a = init_memory_pool().unwrap();
        let pool_b = init_memory_pool().unwrap();

        get_conn(&pool_a)
            .unwrap()
            .execute(
                "INSERT INTO api_keys (key, active, daily_limit, used_today, created_at)
                 VALUES (?, 1, 100, 0, datetime('now'))",
                rusqlite::params!["only-in-a"],
            )
            .unwrap();

        let count: i64 = get_conn(&pool_b)
            .unwrap()
            .query_row("SELECT COUNT(*) FROM api_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
