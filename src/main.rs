mod cli;

use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use rand::{distributions::Alphanumeric, Rng};

use cli::{Cli, Commands};
use tunevault::{config, config::Config, server};
use tunevault_db::models::ApiKey;
use tunevault_db::pool::{get_conn, init_pool, DbPool};
use tunevault_db::queries::api_keys;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "tunevault=trace,tunevault_db=debug,tower_http=debug".to_string()
        } else {
            "tunevault=debug,tunevault_db=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .init();

    match cli.command {
        Commands::Start { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::Validate { config } => {
            validate_config_file(config.as_deref().or(cli.config.as_deref()))
        }
        Commands::GenerateKey {
            daily_limit,
            expires_days,
        } => generate_key(cli.config.as_deref(), daily_limit, expires_days),
        Commands::Version => {
            println!("tunevault {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn start_server(host: String, port: u16, config_path: Option<&Path>) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;

    // Override host/port from CLI if specified
    config.server.host = host;
    config.server.port = port;

    tracing::info!("Starting tunevault server");
    tracing::info!(
        "Server will listen on {}:{}",
        config.server.host,
        config.server.port
    );

    let db_pool = open_pool(&config, config_path)?;

    server::start_server(config, db_pool).await
}

/// Resolve the data directory: explicit config value, then the config
/// file's directory, then the working directory.
fn data_dir(config: &Config, config_path: Option<&Path>) -> PathBuf {
    config
        .server
        .data_dir
        .clone()
        .or_else(|| {
            config_path
                .and_then(|p| p.parent())
                .map(|p| p.to_path_buf())
        })
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_default())
}

fn open_pool(config: &Config, config_path: Option<&Path>) -> Result<DbPool> {
    let db_path = data_dir(config, config_path).join("tunevault.db");
    tracing::info!("Initializing database at {}", db_path.display());
    Ok(init_pool(&db_path.to_string_lossy())?)
}

fn validate_config_file(path: Option<&Path>) -> Result<()> {
    match config::load_config_or_default(path) {
        Ok(_) => {
            println!("Configuration OK");
            Ok(())
        }
        Err(e) => {
            eprintln!("Configuration invalid: {e:#}");
            std::process::exit(1);
        }
    }
}

fn generate_key(
    config_path: Option<&Path>,
    daily_limit: i64,
    expires_days: Option<i64>,
) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let pool = open_pool(&config, config_path)?;

    let key: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect();

    let record = ApiKey {
        key: key.clone(),
        active: true,
        daily_limit,
        used_today: 0,
        last_reset: None,
        expires_at: expires_days.map(|days| Utc::now() + chrono::Duration::days(days)),
        created_at: Utc::now(),
    };

    let conn = get_conn(&pool)?;
    api_keys::insert_key(&conn, &record)?;

    println!("{key}");
    Ok(())
}
