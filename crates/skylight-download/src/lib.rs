//! Skylight Downloads
//!
//! Content the policy engine refuses to render inline is streamed to the
//! user's downloads directory under the server-suggested filename,
//! overwriting any same-named file, and tracked until it completes or
//! fails. Failures are diagnostics, never errors that block browsing.

mod download;
mod error;
mod manager;

pub use download::{Download, DownloadState};
pub use error::DownloadError;
pub use manager::{sanitize_file_name, DownloadManager};

pub type Result<T> = std::result::Result<T, DownloadError>;
