//! Background relay queue.
//!
//! Admitted fetches are submitted as [`RelayJob`]s to a bounded channel and
//! drained by one spawned worker task. The worker, not the originating
//! request, owns the relay: a client disconnecting cannot cancel it, and
//! the cache store on completion serves every future caller. A failed job
//! is only logged; the identifier stays uncached so the next request
//! re-attempts from scratch.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tunevault_common::{Error, Result};
use tunevault_db::models::MediaRecord;

use crate::cache::MediaCache;
use crate::fetch::FetchGuard;
use crate::providers::{MediaMeta, ProviderChain};
use crate::relay::bridge::RelayBridge;
use crate::resolver::format_duration;

/// Channel capacity for the relay job queue.
const QUEUE_CAPACITY: usize = 100;

/// A single admitted fetch-and-relay unit of work.
#[derive(Debug)]
pub struct RelayJob {
    /// Canonical identifier being fetched.
    pub media_id: String,
    /// Metadata captured on the request path, persisted with the record.
    pub meta: MediaMeta,
    /// In-flight token; released when the job finishes either way.
    pub guard: FetchGuard,
}

/// Handle to the background relay worker.
///
/// The worker task runs until all `RelayQueue` handles (and their inner
/// senders) are dropped, at which point the channel closes and the task
/// exits gracefully.
pub struct RelayQueue {
    sender: mpsc::Sender<RelayJob>,
}

impl RelayQueue {
    /// Create a relay queue and spawn its background worker task.
    pub fn new(chain: Arc<ProviderChain>, bridge: Arc<RelayBridge>, cache: Arc<MediaCache>) -> Self {
        let (sender, receiver) = mpsc::channel(QUEUE_CAPACITY);

        tokio::spawn(process_jobs(receiver, chain, bridge, cache));

        Self { sender }
    }

    /// Submit an admitted job without blocking the request path.
    ///
    /// Errs when the worker has stopped or the queue is full. The job (and
    /// its guard) is dropped either way, so the identifier can be
    /// re-admitted by a later request.
    pub fn try_submit(&self, job: RelayJob) -> Result<()> {
        info!(media_id = %job.media_id, title = %job.meta.title, "queueing relay job");

        self.sender
            .try_send(job)
            .map_err(|e| Error::internal(format!("relay queue unavailable: {e}")))
    }
}

/// Background loop that drains the job channel and caches each completed
/// relay.
async fn process_jobs(
    mut receiver: mpsc::Receiver<RelayJob>,
    chain: Arc<ProviderChain>,
    bridge: Arc<RelayBridge>,
    cache: Arc<MediaCache>,
) {
    info!("relay worker started");

    while let Some(job) = receiver.recv().await {
        let media_id = job.media_id.clone();

        match run_job(&chain, &bridge, &cache, &job).await {
            Ok(link) => {
                info!(media_id = %media_id, link = %link, "relay complete, record cached");
            }
            Err(e) => {
                warn!(
                    media_id = %media_id,
                    error = %e,
                    "relay failed; leaving identifier uncached"
                );
            }
        }
        // The job (and its fetch guard) drops here, releasing the
        // in-flight token for this identifier.
    }

    info!("relay worker stopped (channel closed)");
}

/// Discover a source, run the bridge, and store the resolved record.
async fn run_job(
    chain: &ProviderChain,
    bridge: &RelayBridge,
    cache: &MediaCache,
    job: &RelayJob,
) -> Result<String> {
    let source = chain
        .discover_source(&job.media_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("no streamable source for {}", job.media_id)))?;

    let link = bridge
        .relay(&source)
        .await
        .map_err(|e| Error::relay(e.to_string()))?;

    let record = MediaRecord {
        media_id: job.media_id.clone(),
        title: job.meta.title.clone(),
        duration: job
            .meta
            .duration_secs
            .map(format_duration)
            .unwrap_or_else(|| "unknown".to_string()),
        durable_link: link.clone(),
        thumbnail: job.meta.thumbnail.clone(),
        cached_at: Utc::now(),
        access_count: 0,
    };
    cache.store(&record)?;

    Ok(link)
}
