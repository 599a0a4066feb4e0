//! Engine error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Engine not found: {0}")]
    NotFound(String),

    #[error("Engine name cannot be empty")]
    EmptyName,

    #[error("Invalid origin URL: {0}")]
    InvalidOrigin(String),

    #[error("Storage error: {0}")]
    Storage(#[from] skylight_storage::StorageError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
