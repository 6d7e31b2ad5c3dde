//! Provider chain: fixed-priority fallback with credential rotation.
//!
//! The chain walks its providers in registration order. Each provider gets
//! up to [`MetadataProvider::max_attempts`] tries per operation; for a
//! credential-gated provider that is one try per pool credential, and the
//! provider rotates its pool cursor on every request. Any provider error is
//! soft: it costs one attempt and is never surfaced on its own. A
//! definitive empty answer stops the attempts for that provider (another
//! credential will not improve it) but still lets the rest of the chain
//! try. Only whole-chain outcomes reach the caller:
//!
//! - `Ok(Some(_))` -- first successful, non-empty result wins.
//! - `Ok(None)`    -- at least one provider answered definitively empty.
//! - `Err(ProviderExhausted)` -- every attempt failed, nothing definitive.

use std::sync::Arc;

use tracing::{debug, warn};
use tunevault_common::Error;

use super::provider::{MediaMeta, MetadataProvider, ProviderError, SourceStream};

/// What to ask each provider during a chain pass.
enum ChainOp<'q> {
    Search(&'q str),
    Lookup(&'q str),
    Source(&'q str),
}

impl ChainOp<'_> {
    fn describe(&self) -> &'static str {
        match self {
            ChainOp::Search(_) => "search",
            ChainOp::Lookup(_) => "lookup",
            ChainOp::Source(_) => "source discovery",
        }
    }
}

/// Per-attempt outcome, unified across the three operations.
enum Attempt {
    Meta(MediaMeta),
    Source(SourceStream),
    Empty,
    Failed(ProviderError),
}

/// A chain of [`MetadataProvider`]s queried in fixed priority order.
pub struct ProviderChain {
    providers: Vec<Arc<dyn MetadataProvider>>,
}

impl ProviderChain {
    /// Create an empty chain with no providers.
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Register a provider; earlier registrations have higher priority.
    pub fn register(&mut self, provider: Arc<dyn MetadataProvider>) {
        self.providers.push(provider);
    }

    /// Return references to all providers that are currently available.
    pub fn available(&self) -> Vec<&dyn MetadataProvider> {
        self.providers
            .iter()
            .filter(|p| p.is_available())
            .map(|p| p.as_ref())
            .collect()
    }

    /// Find the first media item matching a free-text query.
    pub async fn search(&self, query: &str) -> Result<Option<MediaMeta>, Error> {
        match self.run(ChainOp::Search(query)).await? {
            Some(Attempt::Meta(meta)) => Ok(Some(meta)),
            _ => Ok(None),
        }
    }

    /// Fetch metadata for a known identifier.
    pub async fn lookup(&self, media_id: &str) -> Result<Option<MediaMeta>, Error> {
        match self.run(ChainOp::Lookup(media_id)).await? {
            Some(Attempt::Meta(meta)) => Ok(Some(meta)),
            _ => Ok(None),
        }
    }

    /// Discover a streamable source URL for a known identifier.
    pub async fn discover_source(&self, media_id: &str) -> Result<Option<SourceStream>, Error> {
        match self.run(ChainOp::Source(media_id)).await? {
            Some(Attempt::Source(source)) => Ok(Some(source)),
            _ => Ok(None),
        }
    }

    /// Walk the chain for one operation.
    ///
    /// `Ok(Some(_))` carries the winning attempt, `Ok(None)` means some
    /// provider answered definitively empty, and `Err` means exhaustion.
    async fn run<'q>(&self, op: ChainOp<'q>) -> Result<Option<Attempt>, Error> {
        let what = op.describe();
        let mut attempted = false;
        let mut definitive_empty = false;

        for provider in &self.providers {
            if !provider.is_available() {
                continue;
            }

            let attempts = provider.max_attempts().max(1);
            for attempt in 1..=attempts {
                attempted = true;
                match self.attempt(provider.as_ref(), &op).await {
                    Attempt::Meta(meta) => return Ok(Some(Attempt::Meta(meta))),
                    Attempt::Source(source) => return Ok(Some(Attempt::Source(source))),
                    Attempt::Empty => {
                        debug!(provider = provider.name(), what, "definitive empty answer");
                        definitive_empty = true;
                        break;
                    }
                    Attempt::Failed(ProviderError::Quota(reason)) => {
                        warn!(
                            provider = provider.name(),
                            what, attempt, reason = %reason, "credential quota exhausted, rotating"
                        );
                    }
                    Attempt::Failed(error) => {
                        warn!(
                            provider = provider.name(),
                            what,
                            attempt,
                            error = %error,
                            "provider attempt failed"
                        );
                    }
                }
            }
        }

        if !attempted {
            return Err(Error::provider_exhausted(format!(
                "no providers available for {what}"
            )));
        }
        if definitive_empty {
            Ok(None)
        } else {
            Err(Error::provider_exhausted(format!(
                "every provider failed during {what}"
            )))
        }
    }

    async fn attempt(&self, provider: &dyn MetadataProvider, op: &ChainOp<'_>) -> Attempt {
        match op {
            ChainOp::Search(query) => match provider.search(query).await {
                Ok(Some(meta)) => Attempt::Meta(meta),
                Ok(None) => Attempt::Empty,
                Err(e) => Attempt::Failed(e),
            },
            ChainOp::Lookup(media_id) => match provider.lookup(media_id).await {
                Ok(Some(meta)) => Attempt::Meta(meta),
                Ok(None) => Attempt::Empty,
                Err(e) => Attempt::Failed(e),
            },
            ChainOp::Source(media_id) => match provider.stream_source(media_id).await {
                Ok(Some(source)) => Attempt::Source(source),
                Ok(None) => Attempt::Empty,
                Err(e) => Attempt::Failed(e),
            },
        }
    }
}

impl Default for ProviderChain {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// What a stub provider answers on each successive attempt.
    enum Canned {
        Hit(&'static str),
        Empty,
        Quota,
        Broken,
    }

    /// A stub provider that pops one canned outcome per attempt.
    struct StubProvider {
        provider_name: &'static str,
        available: bool,
        attempts: usize,
        outcomes: Mutex<Vec<Canned>>,
        calls: Mutex<usize>,
    }

    impl StubProvider {
        fn new(name: &'static str, attempts: usize, outcomes: Vec<Canned>) -> Self {
            Self {
                provider_name: name,
                available: true,
                attempts,
                outcomes: Mutex::new(outcomes),
                calls: Mutex::new(0),
            }
        }

        fn unavailable(name: &'static str) -> Self {
            let mut stub = Self::new(name, 1, Vec::new());
            stub.available = false;
            stub
        }

        fn calls(&self) -> usize {
            *self.calls.lock()
        }

        fn next_outcome(&self) -> Result<Option<MediaMeta>, ProviderError> {
            *self.calls.lock() += 1;
            let mut outcomes = self.outcomes.lock();
            if outcomes.is_empty() {
                return Err(ProviderError::Decode("no canned outcome".into()));
            }
            match outcomes.remove(0) {
                Canned::Hit(id) => Ok(Some(MediaMeta {
                    media_id: id.to_string(),
                    title: format!("Title {id}"),
                    duration_secs: Some(100),
                    thumbnail: None,
                })),
                Canned::Empty => Ok(None),
                Canned::Quota => Err(ProviderError::Quota("quotaExceeded".into())),
                Canned::Broken => {
                    Err(ProviderError::Http(reqwest::StatusCode::INTERNAL_SERVER_ERROR))
                }
            }
        }
    }

    #[async_trait]
    impl MetadataProvider for StubProvider {
        fn name(&self) -> &'static str {
            self.provider_name
        }

        fn is_available(&self) -> bool {
            self.available
        }

        fn max_attempts(&self) -> usize {
            self.attempts
        }

        async fn search(&self, _query: &str) -> Result<Option<MediaMeta>, ProviderError> {
            self.next_outcome()
        }

        async fn lookup(&self, _media_id: &str) -> Result<Option<MediaMeta>, ProviderError> {
            self.next_outcome()
        }

        async fn stream_source(
            &self,
            _media_id: &str,
        ) -> Result<Option<SourceStream>, ProviderError> {
            self.next_outcome().map(|meta| {
                meta.map(|m| SourceStream {
                    url: format!("https://source.example.com/{}", m.media_id),
                    container: "mp4".to_string(),
                })
            })
        }
    }

    #[tokio::test]
    async fn first_provider_hit_wins() {
        let mut chain = ProviderChain::new();
        chain.register(Arc::new(StubProvider::new(
            "primary",
            1,
            vec![Canned::Hit("aaaaaaaaaaa")],
        )));
        let second = Arc::new(StubProvider::new("backup", 1, vec![Canned::Hit("bbbbbbbbbbb")]));
        chain.register(second.clone());

        let meta = chain.search("anything").await.unwrap().unwrap();
        assert_eq!(meta.media_id, "aaaaaaaaaaa");
        // The winner short-circuits the rest of the chain.
        assert_eq!(second.calls(), 0);
    }

    #[tokio::test]
    async fn quota_rotates_within_provider() {
        let mut chain = ProviderChain::new();
        chain.register(Arc::new(StubProvider::new(
            "gated",
            3,
            vec![Canned::Quota, Canned::Quota, Canned::Hit("ccccccccccc")],
        )));

        let meta = chain.search("anything").await.unwrap().unwrap();
        assert_eq!(meta.media_id, "ccccccccccc");
    }

    #[tokio::test]
    async fn exhausted_provider_falls_through() {
        let mut chain = ProviderChain::new();
        chain.register(Arc::new(StubProvider::new(
            "gated",
            2,
            vec![Canned::Quota, Canned::Quota],
        )));
        chain.register(Arc::new(StubProvider::new(
            "backup",
            1,
            vec![Canned::Hit("ddddddddddd")],
        )));

        let meta = chain.search("anything").await.unwrap().unwrap();
        assert_eq!(meta.media_id, "ddddddddddd");
    }

    #[tokio::test]
    async fn definitive_empty_ends_provider_but_not_chain() {
        let first = Arc::new(StubProvider::new("gated", 3, vec![Canned::Empty]));
        let mut chain = ProviderChain::new();
        chain.register(first.clone());
        chain.register(Arc::new(StubProvider::new(
            "backup",
            1,
            vec![Canned::Hit("eeeeeeeeeee")],
        )));

        let meta = chain.search("anything").await.unwrap().unwrap();
        assert_eq!(meta.media_id, "eeeeeeeeeee");
        // An empty answer must not burn the remaining credentials.
        assert_eq!(first.calls(), 1);
    }

    #[tokio::test]
    async fn all_empty_is_not_found() {
        let mut chain = ProviderChain::new();
        chain.register(Arc::new(StubProvider::new("a", 1, vec![Canned::Empty])));
        chain.register(Arc::new(StubProvider::new("b", 1, vec![Canned::Empty])));

        assert!(chain.search("anything").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn all_failed_is_exhaustion() {
        let mut chain = ProviderChain::new();
        chain.register(Arc::new(StubProvider::new(
            "a",
            2,
            vec![Canned::Quota, Canned::Broken],
        )));

        let err = chain.search("anything").await.unwrap_err();
        assert!(matches!(err, Error::ProviderExhausted(_)));
    }

    #[tokio::test]
    async fn mixed_empty_and_failure_is_not_found() {
        let mut chain = ProviderChain::new();
        chain.register(Arc::new(StubProvider::new("a", 1, vec![Canned::Empty])));
        chain.register(Arc::new(StubProvider::new("b", 1, vec![Canned::Broken])));

        // One definitive empty answer outweighs the broken backend.
        assert!(chain.search("anything").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unavailable_providers_are_skipped() {
        let offline = Arc::new(StubProvider::unavailable("offline"));
        let mut chain = ProviderChain::new();
        chain.register(offline.clone());
        chain.register(Arc::new(StubProvider::new(
            "online",
            1,
            vec![Canned::Hit("fffffffffff")],
        )));

        let meta = chain.search("anything").await.unwrap().unwrap();
        assert_eq!(meta.media_id, "fffffffffff");
        assert_eq!(offline.calls(), 0);
    }

    #[tokio::test]
    async fn no_available_providers_is_exhaustion() {
        let mut chain = ProviderChain::new();
        chain.register(Arc::new(StubProvider::unavailable("offline")));

        let err = chain.search("anything").await.unwrap_err();
        assert!(matches!(err, Error::ProviderExhausted(_)));
        assert!(chain.available().is_empty());
    }

    #[tokio::test]
    async fn source_discovery_uses_same_policy() {
        let mut chain = ProviderChain::new();
        chain.register(Arc::new(StubProvider::new("meta-only", 1, vec![Canned::Empty])));
        chain.register(Arc::new(StubProvider::new(
            "streaming",
            1,
            vec![Canned::Hit("ggggggggggg")],
        )));

        let source = chain.discover_source("ggggggggggg").await.unwrap().unwrap();
        assert_eq!(source.url, "https://source.example.com/ggggggggggg");
        assert_eq!(source.container, "mp4");
    }
}
