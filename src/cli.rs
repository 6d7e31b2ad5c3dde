use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "tunevault")]
#[command(author, version, about = "Media link resolution and durable caching service")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the resolution server
    Start {
        /// Host to bind to
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Generate an API key and insert it into the usage ledger
    GenerateKey {
        /// Requests allowed per day
        #[arg(long, default_value = "1000")]
        daily_limit: i64,

        /// Days until the key expires (omit for no expiry)
        #[arg(long)]
        expires_days: Option<i64>,
    },

    /// Display version information
    Version,
}
