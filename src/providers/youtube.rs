//! YouTube Data API v3 metadata provider.
//!
//! Implements [`MetadataProvider`] against the credential-gated primary
//! metadata API.
//!
//! Features:
//! - Token-bucket rate limiting at 4 requests / second via [`governor`].
//! - Per-request credential rotation through a shared [`CredentialPool`].
//! - Quota-flavored 403/429 responses surface as [`ProviderError::Quota`],
//!   which the chain treats as a soft failure and answers by rotating.
//! - 15-second request timeout.
//!
//! The Data API never exposes media streams, so source discovery always
//! yields `None` and falls through to the keyless backends.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use super::credentials::CredentialPool;
use super::provider::{MediaMeta, MetadataProvider, ProviderError, SourceStream};

/// Production API base; overridable for tests.
pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/youtube/v3";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

// ---------------------------------------------------------------------------
// API response types (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SearchResponse {
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchItemId,
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
struct SearchItemId {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VideosResponse {
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
struct VideoItem {
    snippet: Snippet,
    #[serde(rename = "contentDetails")]
    content_details: Option<ContentDetails>,
}

#[derive(Debug, Deserialize)]
struct Snippet {
    title: String,
    thumbnails: Option<Thumbnails>,
}

#[derive(Debug, Deserialize)]
struct Thumbnails {
    high: Option<Thumbnail>,
    medium: Option<Thumbnail>,
    default: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ContentDetails {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    errors: Option<Vec<ApiErrorItem>>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorItem {
    reason: Option<String>,
}

// ---------------------------------------------------------------------------
// Provider implementation
// ---------------------------------------------------------------------------

/// Credential-gated YouTube Data API v3 provider.
///
/// Every request takes the next key from the shared [`CredentialPool`], so
/// quota exhaustion on one key rotates the whole process onto the next.
pub struct YouTubeProvider {
    client: reqwest::Client,
    base_url: String,
    credentials: Arc<CredentialPool>,
    rate_limiter: RateLimiter<
        governor::state::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

impl YouTubeProvider {
    /// Create a provider against `base_url` drawing keys from `credentials`.
    pub fn new(base_url: String, credentials: Arc<CredentialPool>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("failed to build reqwest client");

        let quota = Quota::per_second(NonZeroU32::new(4).unwrap());
        let rate_limiter = RateLimiter::direct(quota);

        Self {
            client,
            base_url,
            credentials,
            rate_limiter,
        }
    }

    /// Execute a rate-limited GET, attaching the next pool credential.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T, ProviderError> {
        let key = self
            .credentials
            .next_key()
            .ok_or_else(|| ProviderError::Decode("credential pool is empty".to_string()))?;

        self.rate_limiter.until_ready().await;

        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .get(&url)
            .query(params)
            .query(&[("key", key.as_str())])
            .send()
            .await?;

        let status = resp.status();
        if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
            let body = resp.text().await.unwrap_or_default();
            if let Some(reason) = quota_reason(&body) {
                return Err(ProviderError::Quota(reason));
            }
            return Err(ProviderError::Http(status));
        }
        if !status.is_success() {
            return Err(ProviderError::Http(status));
        }

        resp.json::<T>()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))
    }
}

#[async_trait]
impl MetadataProvider for YouTubeProvider {
    fn name(&self) -> &'static str {
        "youtube"
    }

    fn is_available(&self) -> bool {
        !self.credentials.is_empty()
    }

    fn max_attempts(&self) -> usize {
        self.credentials.len().max(1)
    }

    async fn search(&self, query: &str) -> Result<Option<MediaMeta>, ProviderError> {
        let resp: SearchResponse = self
            .get_json(
                "/search",
                &[
                    ("part", "snippet"),
                    ("type", "video"),
                    ("maxResults", "1"),
                    ("q", query),
                ],
            )
            .await?;

        let Some(item) = resp.items.into_iter().next() else {
            return Ok(None);
        };
        let Some(video_id) = item.id.video_id else {
            return Ok(None);
        };

        debug!(media_id = %video_id, "search hit");
        Ok(Some(MediaMeta {
            media_id: video_id,
            title: item.snippet.title,
            // The search endpoint does not carry contentDetails.
            duration_secs: None,
            thumbnail: best_thumbnail(item.snippet.thumbnails),
        }))
    }

    async fn lookup(&self, media_id: &str) -> Result<Option<MediaMeta>, ProviderError> {
        let resp: VideosResponse = self
            .get_json(
                "/videos",
                &[("part", "snippet,contentDetails"), ("id", media_id)],
            )
            .await?;

        let Some(item) = resp.items.into_iter().next() else {
            return Ok(None);
        };

        let duration_secs = item
            .content_details
            .and_then(|d| d.duration)
            .and_then(|raw| parse_iso8601_duration(&raw));

        Ok(Some(MediaMeta {
            media_id: media_id.to_string(),
            title: item.snippet.title,
            duration_secs,
            thumbnail: best_thumbnail(item.snippet.thumbnails),
        }))
    }

    async fn stream_source(
        &self,
        _media_id: &str,
    ) -> Result<Option<SourceStream>, ProviderError> {
        // The Data API exposes no media streams.
        Ok(None)
    }
}

/// Pick the largest available thumbnail variant.
fn best_thumbnail(thumbnails: Option<Thumbnails>) -> Option<String> {
    let t = thumbnails?;
    t.high
        .or(t.medium)
        .or(t.default)
        .map(|thumb| thumb.url)
}

/// Extract a quota-flavored rejection reason from an API error body.
fn quota_reason(body: &str) -> Option<String> {
    let parsed: ApiErrorBody = serde_json::from_str(body).ok()?;
    parsed
        .error?
        .errors
        .unwrap_or_default()
        .into_iter()
        .filter_map(|item| item.reason)
        .find(|reason| {
            reason.contains("quota") || reason.contains("rateLimit") || reason.contains("dailyLimit")
        })
}

/// Parse an ISO-8601 duration of the `P#DT#H#M#S` form into seconds.
///
/// Returns `None` for forms using calendar units (years, months), which the
/// API never emits for video lengths.
fn parse_iso8601_duration(raw: &str) -> Option<u64> {
    let rest = raw.strip_prefix('P')?;
    let mut total = 0u64;
    let mut value: Option<u64> = None;
    let mut in_time = false;

    for c in rest.chars() {
        match c {
            'T' => in_time = true,
            '0'..='9' => {
                let digit = c as u64 - '0' as u64;
                value = Some(value.unwrap_or(0) * 10 + digit);
            }
            'D' if !in_time => total += value.take()? * 86_400,
            'H' if in_time => total += value.take()? * 3_600,
            'M' if in_time => total += value.take()? * 60,
            'S' if in_time => total += value.take()?,
            _ => return None,
        }
    }

    Some(total)
}
