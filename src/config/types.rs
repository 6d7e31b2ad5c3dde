use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub providers: ProvidersConfig,

    #[serde(default)]
    pub relay: RelayConfig,

    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory for the SQLite database. Defaults to the config file's
    /// directory, then the working directory.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            data_dir: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// Require a valid API key on the resolve endpoint.
    #[serde(default = "default_true")]
    pub required: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            required: default_true(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProvidersConfig {
    /// Base URL of the primary metadata API.
    #[serde(default = "default_youtube_api_base")]
    pub youtube_api_base: String,

    /// Rotating API keys for the primary metadata API. Empty disables it.
    #[serde(default)]
    pub youtube_api_keys: Vec<String>,

    /// Invidious instances tried in order after the primary API. These are
    /// also the source-discovery backends for the relay.
    #[serde(default)]
    pub invidious_instances: Vec<String>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            youtube_api_base: default_youtube_api_base(),
            youtube_api_keys: Vec::new(),
            invidious_instances: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RelayConfig {
    /// Multipart upload endpoint of the durable file host.
    #[serde(default = "default_upload_url")]
    pub upload_url: String,

    /// Scheme prefix a host answer must start with to count as a link.
    #[serde(default = "default_link_prefix")]
    pub link_prefix: String,

    /// Scratch directory for in-flight downloads. Defaults to the system
    /// temp directory.
    #[serde(default)]
    pub scratch_dir: Option<PathBuf>,

    /// Upper bound on total download transfer time.
    #[serde(default = "default_download_timeout")]
    pub download_timeout_secs: u64,

    /// Fixed ceiling for the upload request.
    #[serde(default = "default_upload_timeout")]
    pub upload_timeout_secs: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            upload_url: default_upload_url(),
            link_prefix: default_link_prefix(),
            scratch_dir: None,
            download_timeout_secs: default_download_timeout(),
            upload_timeout_secs: default_upload_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Records preloaded into the RAM tier at startup.
    #[serde(default = "default_preload_count")]
    pub preload_count: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            preload_count: default_preload_count(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_true() -> bool {
    true
}

fn default_youtube_api_base() -> String {
    crate::providers::youtube::DEFAULT_API_BASE.to_string()
}

fn default_upload_url() -> String {
    "https://catbox.moe/user/api.php".to_string()
}

fn default_link_prefix() -> String {
    "https://".to_string()
}

fn default_download_timeout() -> u64 {
    300
}

fn default_upload_timeout() -> u64 {
    60
}

fn default_preload_count() -> usize {
    100
}
