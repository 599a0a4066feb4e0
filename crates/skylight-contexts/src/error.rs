//! Pool error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PoolError {
    #[error("Context not found: {0}")]
    NotFound(String),

    #[error("Invalid origin URL: {0}")]
    InvalidOrigin(String),

    #[error("Session index out of range: {0}")]
    SessionOutOfRange(usize),

    #[error("Storage error: {0}")]
    Storage(#[from] skylight_storage::StorageError),
}
