//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which wires a full [`AppContext`] over an
//! in-memory database. The [`with_server`](TestHarness::with_server)
//! constructor starts Axum on a random port for HTTP-level testing.

use std::net::SocketAddr;

use chrono::Utc;
use tunevault::config::Config;
use tunevault::server::{build_context, create_router, AppContext};
use tunevault_db::models::ApiKey;
use tunevault_db::pool::{get_conn, init_memory_pool, DbPool, PooledConnection};
use tunevault_db::queries::api_keys;

/// Test harness wrapping a fully-constructed [`AppContext`] backed by an
/// in-memory database.
pub struct TestHarness {
    pub ctx: AppContext,
    pub db: DbPool,
}

impl TestHarness {
    /// Create a new harness with the given configuration and in-memory DB.
    pub fn with_config(config: Config) -> Self {
        let db = init_memory_pool().expect("failed to create in-memory pool");
        let ctx = build_context(config, db.clone());
        Self { ctx, db }
    }

    /// Start an Axum server on a random port and return the harness
    /// together with the bound socket address.
    pub async fn with_server(config: Config) -> (Self, SocketAddr) {
        let harness = Self::with_config(config);
        let app = create_router(harness.ctx.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        (harness, addr)
    }

    /// Get a database connection from the pool.
    pub fn conn(&self) -> PooledConnection {
        get_conn(&self.db).expect("failed to get db connection")
    }

    /// Insert an active API key with a generous daily limit.
    pub fn seed_key(&self, key: &str) {
        let record = ApiKey {
            key: key.to_string(),
            active: true,
            daily_limit: 1000,
            used_today: 0,
            last_reset: None,
            expires_at: None,
            created_at: Utc::now(),
        };
        api_keys::insert_key(&self.conn(), &record).expect("failed to seed api key");
    }
}
