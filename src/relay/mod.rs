//! Download-then-upload relay turning transient source URLs into durable
//! hosted links.
//!
//! - [`bridge`] -- the single-shot download/upload transaction.
//! - [`queue`] -- the bounded background queue that runs it.

pub mod bridge;
pub mod queue;

pub use bridge::{RelayBridge, RelayError};
pub use queue::{RelayJob, RelayQueue};
