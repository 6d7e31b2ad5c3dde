//! Shared foundations for tunevault.
//!
//! This crate holds the process-wide error taxonomy used by every other
//! tunevault crate.

pub mod error;

pub use error::{Error, Result};
