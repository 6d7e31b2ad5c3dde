use anyhow::{Context, Result};
use axum::{
    http::{header, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tunevault_db::pool::DbPool;

use crate::cache::MediaCache;
use crate::config::Config;
use crate::fetch::FetchRegistry;
use crate::providers::{CredentialPool, InvidiousProvider, ProviderChain, YouTubeProvider};
use crate::relay::{RelayBridge, RelayQueue};
use crate::resolve::ResolveService;

pub mod routes_api;

/// Shared application context
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    /// Database connection pool (cache persistent tier + API key ledger)
    pub db: DbPool,
    /// Resolution pipeline entry point
    pub service: Arc<ResolveService>,
    /// Multi-tier cache, shared with the service (exposed for preload)
    pub cache: Arc<MediaCache>,
}

/// Wire the full resolution pipeline from config and pool.
///
/// Used by both [`start_server`] and the integration-test harness. Must run
/// inside a Tokio runtime: creating the relay queue spawns its worker task.
pub fn build_context(config: Config, db: DbPool) -> AppContext {
    let credentials = Arc::new(CredentialPool::new(config.providers.youtube_api_keys.clone()));
    let mut chain = ProviderChain::new();
    chain.register(Arc::new(YouTubeProvider::new(
        config.providers.youtube_api_base.clone(),
        credentials,
    )));
    for instance in &config.providers.invidious_instances {
        chain.register(Arc::new(InvidiousProvider::new(instance.clone())));
    }
    let chain = Arc::new(chain);

    let cache = Arc::new(MediaCache::new(db.clone()));
    let bridge = Arc::new(RelayBridge::new(&config.relay));
    let inflight = FetchRegistry::new();
    let queue = RelayQueue::new(Arc::clone(&chain), bridge, Arc::clone(&cache));
    let service = Arc::new(ResolveService::new(
        Arc::clone(&cache),
        chain,
        inflight,
        queue,
    ));

    AppContext {
        config: Arc::new(config),
        db,
        service,
        cache,
    }
}

/// Create the Axum router with all routes
pub fn create_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", routes_api::api_routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

/// Start the HTTP server
pub async fn start_server(config: Config, db: DbPool) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let ctx = build_context(config, db);

    // Warm the RAM tier; failure only costs first-hit latency.
    match ctx.cache.preload(ctx.config.cache.preload_count) {
        Ok(count) => tracing::info!("Preloaded {} records into the RAM tier", count),
        Err(e) => tracing::warn!("Cache preload failed: {}", e),
    }

    let app = create_router(ctx);

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
