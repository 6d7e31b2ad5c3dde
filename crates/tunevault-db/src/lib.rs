//! SQLite persistence for tunevault.
//!
//! Holds the connection pool, embedded schema migrations, row models, and
//! query modules for the resolved-media cache tier and the API key ledger.

pub mod migrations;
pub mod models;
pub mod pool;
pub mod queries;
