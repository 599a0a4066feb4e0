//! Skylight Storage Layer
//!
//! SQLite-based persistence for the engine catalog, per-engine zoom levels
//! and key/value settings.

mod database;
mod error;
mod migrations;

pub use database::Database;
pub use error::StorageError;

pub type Result<T> = std::result::Result<T, StorageError>;
