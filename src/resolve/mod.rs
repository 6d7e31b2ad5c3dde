//! Resolution orchestration: the request-handling state machine.
//!
//! A request moves through resolve → cache lookup → admit, with two fast
//! terminal states (cache hit, already in flight) and one slow one
//! (admitted, queued for background relay). The synchronous path never
//! blocks on the download-relay bridge: an unseen identifier is answered
//! with "accepted, retry shortly" while the bridge runs detached, and its
//! completion performs the cache store that future requests hit.
//!
//! Auth is checked by the route handler before this service runs, so a
//! rejected key causes zero provider or cache calls.

use std::sync::Arc;

use tracing::warn;
use tunevault_common::Result;
use tunevault_db::models::MediaRecord;

use crate::cache::MediaCache;
use crate::fetch::{Admission, FetchRegistry};
use crate::providers::{MediaMeta, ProviderChain};
use crate::relay::{RelayJob, RelayQueue};
use crate::resolver;

/// Terminal outcome of the synchronous resolution path.
#[derive(Debug)]
pub enum Resolution {
    /// The identifier is resolved; the record carries the durable link.
    Resolved(MediaRecord),
    /// A fetch is running (ours or another request's); retry shortly.
    Accepted(MediaMeta),
    /// No media matched the query across the full provider chain.
    NotFound,
}

/// Orchestrates identifier resolution, caching, dedup, and relay admission.
pub struct ResolveService {
    cache: Arc<MediaCache>,
    chain: Arc<ProviderChain>,
    inflight: Arc<FetchRegistry>,
    queue: RelayQueue,
}

impl ResolveService {
    pub fn new(
        cache: Arc<MediaCache>,
        chain: Arc<ProviderChain>,
        inflight: Arc<FetchRegistry>,
        queue: RelayQueue,
    ) -> Self {
        Self {
            cache,
            chain,
            inflight,
            queue,
        }
    }

    /// Resolve a raw query to a cached record, an accepted fetch, or
    /// not-found.
    pub async fn resolve(&self, query: &str) -> Result<Resolution> {
        // Literal identifier, or discover one through the provider chain.
        let (media_id, mut meta) = match resolver::extract_media_id(query) {
            Some(media_id) => (media_id, None),
            None => match self.chain.search(query).await? {
                Some(meta) => (meta.media_id.clone(), Some(meta)),
                None => return Ok(Resolution::NotFound),
            },
        };

        // Cache fast path: RAM tier, then persistent tier.
        if let Some(record) = self.cache.lookup(&media_id)? {
            return Ok(Resolution::Resolved(record));
        }

        // Fill in metadata for literal identifiers. Metadata absence must
        // not block the relay, so chain failures degrade to a placeholder.
        if meta.is_none() {
            meta = match self.chain.lookup(&media_id).await {
                Ok(found) => found,
                Err(e) => {
                    warn!(
                        media_id = %media_id,
                        error = %e,
                        "metadata lookup failed; using placeholder"
                    );
                    None
                }
            };
        }
        let meta = meta.unwrap_or_else(|| MediaMeta {
            media_id: media_id.clone(),
            title: format!("Video {media_id}"),
            duration_secs: None,
            thumbnail: None,
        });

        // Admit exactly one fetch; everyone else gets the accepted answer.
        match self.inflight.try_admit(&media_id) {
            Admission::AlreadyInFlight => Ok(Resolution::Accepted(meta)),
            Admission::Admitted(guard) => {
                self.queue.try_submit(RelayJob {
                    media_id,
                    meta: meta.clone(),
                    guard,
                })?;
                Ok(Resolution::Accepted(meta))
            }
        }
    }

    /// Aggregate count of resolved records, for the stats route.
    pub fn resolved_count(&self) -> Result<i64> {
        self.cache.resolved_count()
    }
}
