//! Shell error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShellError {
    #[error("Storage error: {0}")]
    Storage(#[from] skylight_storage::StorageError),

    #[error("Engine error: {0}")]
    Engine(#[from] skylight_engines::EngineError),

    #[error("Pool error: {0}")]
    Pool(#[from] skylight_contexts::PoolError),

    #[error("Download error: {0}")]
    Download(#[from] skylight_download::DownloadError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<std::io::Error> for ShellError {
    fn from(e: std::io::Error) -> Self {
        ShellError::Config(e.to_string())
    }
}
