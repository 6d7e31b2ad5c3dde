//! Metadata and source providers with credential rotation and fallback.
//!
//! # Module layout
//!
//! - [`provider`] -- Trait definition and shared data types.
//! - [`credentials`] -- Rotating credential pool for quota-gated backends.
//! - [`youtube`] -- Primary metadata API (credential-gated).
//! - [`invidious`] -- Keyless fallback instances with source discovery.
//! - [`chain`] -- Fixed-priority fallback chain over all of the above.

pub mod chain;
pub mod credentials;
pub mod invidious;
pub mod provider;
pub mod youtube;

pub use chain::ProviderChain;
pub use credentials::CredentialPool;
pub use invidious::InvidiousProvider;
pub use provider::{MediaMeta, MetadataProvider, ProviderError, SourceStream};
pub use youtube::YouTubeProvider;
