//! In-flight fetch deduplication.
//!
//! [`FetchRegistry::try_admit`] hands out at most one [`FetchGuard`] per
//! identifier. The token is released when the guard drops, which covers
//! every exit path of the background relay. Callers that find the
//! identifier already in flight answer "processing, retry later" rather
//! than blocking on another request's fetch.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// Registry of identifiers with a fetch currently in flight.
#[derive(Debug, Default)]
pub struct FetchRegistry {
    inflight: DashMap<String, ()>,
}

/// Outcome of an admission attempt.
pub enum Admission {
    /// The caller owns the fetch; the guard releases the token on drop.
    Admitted(FetchGuard),
    /// Another fetch for this identifier is already running.
    AlreadyInFlight,
}

impl FetchRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Try to claim the fetch for an identifier.
    ///
    /// Exactly one concurrent caller per identifier receives
    /// [`Admission::Admitted`]; the entry-based insert makes the check and
    /// the claim a single atomic step.
    pub fn try_admit(self: &Arc<Self>, media_id: &str) -> Admission {
        match self.inflight.entry(media_id.to_string()) {
            Entry::Occupied(_) => Admission::AlreadyInFlight,
            Entry::Vacant(slot) => {
                slot.insert(());
                Admission::Admitted(FetchGuard {
                    registry: Arc::clone(self),
                    media_id: media_id.to_string(),
                })
            }
        }
    }

    /// Whether a fetch for this identifier is currently in flight.
    pub fn in_flight(&self, media_id: &str) -> bool {
        self.inflight.contains_key(media_id)
    }
}

/// Ownership token for a single in-flight fetch.
#[derive(Debug)]
pub struct FetchGuard {
    registry: Arc<FetchRegistry>,
    media_id: String,
}

impl Drop for FetchGuard {
    fn drop(&mut self) {
        self.registry.inflight.remove(&self.media_id);
    }
}
