//! Invidious instance provider.
//!
//! Invidious instances are keyless, so each configured instance is
//! registered as its own provider and the chain's provider fallback doubles
//! as instance fallback. Unlike the primary API these backends can also
//! hand out directly streamable muxed format URLs, which makes them the
//! source-discovery step of the relay.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use super::provider::{MediaMeta, MetadataProvider, ProviderError, SourceStream};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

// ---------------------------------------------------------------------------
// API response types (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SearchEntry {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
    title: Option<String>,
    #[serde(rename = "lengthSeconds")]
    length_seconds: Option<u64>,
    #[serde(rename = "videoThumbnails")]
    video_thumbnails: Option<Vec<VideoThumbnail>>,
}

#[derive(Debug, Deserialize)]
struct VideoResponse {
    title: Option<String>,
    #[serde(rename = "lengthSeconds")]
    length_seconds: Option<u64>,
    #[serde(rename = "videoThumbnails")]
    video_thumbnails: Option<Vec<VideoThumbnail>>,
    #[serde(rename = "formatStreams")]
    format_streams: Option<Vec<FormatStream>>,
}

#[derive(Debug, Deserialize)]
struct VideoThumbnail {
    quality: Option<String>,
    url: String,
}

#[derive(Debug, Deserialize)]
struct FormatStream {
    url: String,
    itag: Option<String>,
    container: Option<String>,
}

// ---------------------------------------------------------------------------
// Provider implementation
// ---------------------------------------------------------------------------

/// A single keyless Invidious instance.
pub struct InvidiousProvider {
    client: reqwest::Client,
    base_url: String,
}

impl InvidiousProvider {
    /// Create a provider for one instance base URL (no trailing slash).
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("failed to build reqwest client");

        Self { client, base_url }
    }

    /// Fetch the full video document, `Ok(None)` on 404.
    async fn fetch_video(&self, media_id: &str) -> Result<Option<VideoResponse>, ProviderError> {
        let url = format!("{}/api/v1/videos/{}", self.base_url, media_id);
        let resp = self.client.get(&url).send().await?;

        match resp.status() {
            StatusCode::NOT_FOUND => return Ok(None),
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(ProviderError::Quota("instance rate limited".to_string()))
            }
            status if !status.is_success() => return Err(ProviderError::Http(status)),
            _ => {}
        }

        resp.json::<VideoResponse>()
            .await
            .map(Some)
            .map_err(|e| ProviderError::Decode(e.to_string()))
    }
}

#[async_trait]
impl MetadataProvider for InvidiousProvider {
    fn name(&self) -> &'static str {
        "invidious"
    }

    fn is_available(&self) -> bool {
        !self.base_url.is_empty()
    }

    async fn search(&self, query: &str) -> Result<Option<MediaMeta>, ProviderError> {
        let url = format!("{}/api/v1/search", self.base_url);
        let resp = self
            .client
            .get(&url)
            .query(&[("q", query), ("type", "video")])
            .send()
            .await?;

        match resp.status() {
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(ProviderError::Quota("instance rate limited".to_string()))
            }
            status if !status.is_success() => return Err(ProviderError::Http(status)),
            _ => {}
        }

        let entries = resp
            .json::<Vec<SearchEntry>>()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;

        for entry in entries {
            let Some(media_id) = entry.video_id else {
                continue;
            };
            debug!(instance = %self.base_url, media_id = %media_id, "search hit");
            return Ok(Some(MediaMeta {
                title: entry
                    .title
                    .unwrap_or_else(|| format!("Video {media_id}")),
                duration_secs: entry.length_seconds,
                thumbnail: best_thumbnail(entry.video_thumbnails),
                media_id,
            }));
        }

        Ok(None)
    }

    async fn lookup(&self, media_id: &str) -> Result<Option<MediaMeta>, ProviderError> {
        let Some(video) = self.fetch_video(media_id).await? else {
            return Ok(None);
        };

        Ok(Some(MediaMeta {
            media_id: media_id.to_string(),
            title: video
                .title
                .unwrap_or_else(|| format!("Video {media_id}")),
            duration_secs: video.length_seconds,
            thumbnail: best_thumbnail(video.video_thumbnails),
        }))
    }

    async fn stream_source(&self, media_id: &str) -> Result<Option<SourceStream>, ProviderError> {
        let Some(video) = self.fetch_video(media_id).await? else {
            return Ok(None);
        };

        let streams = video.format_streams.unwrap_or_default();
        // Muxed formats carry ascending itags for ascending quality; take
        // the best one the instance offers.
        let best = streams
            .into_iter()
            .max_by_key(|s| s.itag.as_deref().and_then(|i| i.parse::<u32>().ok()));

        Ok(best.map(|stream| SourceStream {
            url: stream.url,
            container: stream.container.unwrap_or_else(|| "mp4".to_string()),
        }))
    }
}

/// Prefer the `high` quality thumbnail, falling back to the first listed.
fn best_thumbnail(thumbnails: Option<Vec<VideoThumbnail>>) -> Option<String> {
    let mut thumbnails = thumbnails?;
    if let Some(pos) = thumbnails
        .iter()
        .position(|t| t.quality.as_deref() == Some("high"))
    {
        return Some(thumbnails.swap_remove(pos).url);
    }
    thumbnails.into_iter().next().map(|t| t.url)
}
