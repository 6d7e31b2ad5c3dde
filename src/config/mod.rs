mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    // Try default locations
    let default_paths = [
        "./config.toml",
        "./tunevault.toml",
        "~/.config/tunevault/config.toml",
        "/etc/tunevault/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
fn validate_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    if config.relay.download_timeout_secs == 0 || config.relay.upload_timeout_secs == 0 {
        anyhow::bail!("Relay timeouts cannot be 0");
    }

    if config.relay.link_prefix.is_empty() {
        anyhow::bail!("Relay link prefix cannot be empty");
    }

    if config.relay.upload_url.is_empty() {
        anyhow::bail!("Relay upload URL cannot be empty");
    }

    if config.providers.youtube_api_keys.is_empty() && config.providers.invidious_instances.is_empty()
    {
        tracing::warn!(
            "No metadata providers configured; only already-cached queries will resolve"
        );
    } else if config.providers.invidious_instances.is_empty() {
        tracing::warn!(
            "No source-capable providers configured; first-time fetches will fail"
        );
    }

    Ok(())
}
