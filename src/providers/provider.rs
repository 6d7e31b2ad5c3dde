//! Trait definition and types for metadata providers.
//!
//! This module defines the [`MetadataProvider`] trait that all metadata
//! backends must implement, along with the shared data types returned by
//! provider queries and the provider-level failure taxonomy.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Metadata for a single media item as reported by a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaMeta {
    /// Canonical platform identifier.
    pub media_id: String,
    /// Display title of the item.
    pub title: String,
    /// Duration in seconds, when the provider reports one.
    pub duration_secs: Option<u64>,
    /// Thumbnail URL, if available.
    pub thumbnail: Option<String>,
}

/// A transient, directly streamable source for a media item.
#[derive(Debug, Clone)]
pub struct SourceStream {
    /// Fully-qualified URL of the byte stream.
    pub url: String,
    /// Container hint used for scratch-file naming (e.g. `"mp4"`).
    pub container: String,
}

/// Provider-level failure. Always soft at chain level: the chain rotates
/// to the next credential or falls through to the next provider, and only
/// whole-chain exhaustion surfaces to callers.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The provider reported an explicit quota or rate-limit condition for
    /// the presented credential.
    #[error("quota exhausted: {0}")]
    Quota(String),

    /// The provider answered with an unexpected HTTP status.
    #[error("unexpected status {0}")]
    Http(reqwest::StatusCode),

    /// The request failed at the transport level (includes timeouts).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The response body did not match the expected shape.
    #[error("malformed response: {0}")]
    Decode(String),
}

/// Async trait that all metadata providers implement.
///
/// Each provider wraps a single external backend and exposes a uniform
/// interface for free-text search, identifier lookup, and stream-source
/// discovery. Providers are wrapped in an `Arc` and shared across tasks.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Short, lowercase identifier for this provider (e.g. `"youtube"`).
    fn name(&self) -> &'static str;

    /// Returns `true` when the provider is configured and ready to serve
    /// requests.
    fn is_available(&self) -> bool;

    /// Number of attempts the chain may make against this provider per
    /// operation. Credential-gated providers report their pool size so a
    /// rotation pass covers every credential exactly once.
    fn max_attempts(&self) -> usize {
        1
    }

    /// Find the first media item matching a free-text query.
    ///
    /// `Ok(None)` is a definitive "no results", distinct from any error.
    async fn search(&self, query: &str) -> Result<Option<MediaMeta>, ProviderError>;

    /// Fetch metadata for a known identifier.
    async fn lookup(&self, media_id: &str) -> Result<Option<MediaMeta>, ProviderError>;

    /// Discover a streamable source URL for a known identifier.
    ///
    /// Metadata-only providers return `Ok(None)`.
    async fn stream_source(&self, media_id: &str) -> Result<Option<SourceStream>, ProviderError>;
}
