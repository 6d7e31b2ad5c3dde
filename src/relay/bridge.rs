//! Single-shot download-then-upload bridge.
//!
//! A relay streams the source into a uniquely named scratch file, uploads
//! it to the durable host as one multipart file field, and accepts the
//! answer only if it is a link with the expected scheme prefix. The scratch
//! file is removed on every exit path (drop-based cleanup). The bridge
//! never retries; a failed relay leaves the identifier uncached so a later
//! request can start over from scratch.

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::StreamExt;
use reqwest::multipart;
use tokio::io::AsyncWriteExt;
use tokio_util::codec::{BytesCodec, FramedRead};
use tracing::debug;

use crate::config::RelayConfig;
use crate::providers::SourceStream;

/// Failure taxonomy for a single relay attempt.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("failed to create scratch file: {0}")]
    Scratch(String),

    #[error("download failed: {0}")]
    Download(String),

    #[error("download exceeded {}s", .0.as_secs())]
    DownloadTimeout(Duration),

    #[error("upload failed: {0}")]
    Upload(String),

    #[error("upload exceeded {}s", .0.as_secs())]
    UploadTimeout(Duration),

    #[error("durable host returned a malformed response: {0:?}")]
    HostResponse(String),
}

/// Bridge between a transient source URL and the durable file host.
pub struct RelayBridge {
    client: reqwest::Client,
    upload_url: String,
    link_prefix: String,
    scratch_dir: PathBuf,
    download_timeout: Duration,
    upload_timeout: Duration,
}

impl RelayBridge {
    /// Create a bridge from the relay configuration.
    ///
    /// No per-request timeout is set on the shared client; the download is
    /// bounded by total transfer time and the upload by a fixed request
    /// ceiling instead.
    pub fn new(config: &RelayConfig) -> Self {
        let client = reqwest::Client::builder()
            .build()
            .expect("failed to build reqwest client");

        Self {
            client,
            upload_url: config.upload_url.clone(),
            link_prefix: config.link_prefix.clone(),
            scratch_dir: config
                .scratch_dir
                .clone()
                .unwrap_or_else(std::env::temp_dir),
            download_timeout: Duration::from_secs(config.download_timeout_secs),
            upload_timeout: Duration::from_secs(config.upload_timeout_secs),
        }
    }

    /// Relay one source to the durable host, returning the durable link.
    pub async fn relay(&self, source: &SourceStream) -> Result<String, RelayError> {
        let scratch = tempfile::Builder::new()
            .prefix("relay-")
            .suffix(&format!(".{}", source.container))
            .tempfile_in(&self.scratch_dir)
            .map_err(|e| RelayError::Scratch(e.to_string()))?;

        debug!(
            url = %source.url,
            scratch = %scratch.path().display(),
            "starting relay download"
        );
        self.download_to(&source.url, scratch.path()).await?;
        self.upload(scratch.path()).await
        // `scratch` drops here on success and on every error path above,
        // removing the file regardless of the relay outcome.
    }

    /// Stream the source into the scratch file, bounded by total transfer time.
    async fn download_to(&self, url: &str, path: &Path) -> Result<(), RelayError> {
        let transfer = async {
            let resp = self
                .client
                .get(url)
                .send()
                .await
                .and_then(|resp| resp.error_for_status())
                .map_err(|e| RelayError::Download(e.to_string()))?;

            let mut file = tokio::fs::File::create(path)
                .await
                .map_err(|e| RelayError::Download(e.to_string()))?;

            let mut stream = resp.bytes_stream();
            while let Some(chunk) = stream.next().await {
                let chunk = chunk.map_err(|e| RelayError::Download(e.to_string()))?;
                file.write_all(&chunk)
                    .await
                    .map_err(|e| RelayError::Download(e.to_string()))?;
            }
            file.flush()
                .await
                .map_err(|e| RelayError::Download(e.to_string()))
        };

        tokio::time::timeout(self.download_timeout, transfer)
            .await
            .map_err(|_| RelayError::DownloadTimeout(self.download_timeout))?
    }

    /// Upload the scratch file as one multipart file field and validate the
    /// host's answer.
    async fn upload(&self, path: &Path) -> Result<String, RelayError> {
        let file = tokio::fs::File::open(path)
            .await
            .map_err(|e| RelayError::Upload(e.to_string()))?;
        let length = file
            .metadata()
            .await
            .map_err(|e| RelayError::Upload(e.to_string()))?
            .len();

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.bin".to_string());
        let body = reqwest::Body::wrap_stream(FramedRead::new(file, BytesCodec::new()));
        let part = multipart::Part::stream_with_length(body, length)
            .file_name(file_name)
            .mime_str("application/octet-stream")
            .map_err(|e| RelayError::Upload(e.to_string()))?;
        let form = multipart::Form::new()
            .text("reqtype", "fileupload")
            .part("fileToUpload", part);

        let resp = self
            .client
            .post(&self.upload_url)
            .multipart(form)
            .timeout(self.upload_timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RelayError::UploadTimeout(self.upload_timeout)
                } else {
                    RelayError::Upload(e.to_string())
                }
            })?;

        if !resp.status().is_success() {
            return Err(RelayError::Upload(format!(
                "host answered with status {}",
                resp.status()
            )));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| RelayError::Upload(e.to_string()))?;
        let link = body.trim();
        if link.is_empty()
            || !link.starts_with(&self.link_prefix)
            || link.contains(char::is_whitespace)
        {
            return Err(RelayError::HostResponse(link.to_string()));
        }

        debug!(link, "relay upload complete");
        Ok(link.to_string())
    }
}
