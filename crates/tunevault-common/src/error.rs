//! Common error types used throughout tunevault.
//!
//! This module provides a unified error type covering the failure taxonomy
//! of the resolution pipeline: auth rejection, not-found, provider
//! exhaustion, relay failure, and the usual database/I-O cases.

/// Common error type for tunevault.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The API key was missing, inactive, expired, or over its daily limit.
    #[error("Invalid or expired API key")]
    AuthRejected,

    /// No media matched the query across the full provider chain.
    #[error("Media not found: {0}")]
    NotFound(String),

    /// Every credential and fallback provider was attempted without a
    /// definitive answer.
    #[error("Metadata providers exhausted: {0}")]
    ProviderExhausted(String),

    /// The download-then-upload relay failed; the identifier stays
    /// uncached so a later request can re-attempt.
    #[error("Relay failed: {0}")]
    Relay(String),

    /// A database operation failed.
    #[error("Database error: {0}")]
    Database(String),

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input was provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new NotFound error.
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a new ProviderExhausted error.
    pub fn provider_exhausted<S: Into<String>>(msg: S) -> Self {
        Self::ProviderExhausted(msg.into())
    }

    /// Create a new Relay error.
    pub fn relay<S: Into<String>>(msg: S) -> Self {
        Self::Relay(msg.into())
    }

    /// Create a new Database error.
    pub fn database<S: Into<String>>(msg: S) -> Self {
        Self::Database(msg.into())
    }

    /// Create a new InvalidInput error.
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a new Internal error.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
