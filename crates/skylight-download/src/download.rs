//! Download data structure

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadState {
    /// Intercepted, transfer not yet started
    Pending,
    /// Transfer in progress
    Downloading,
    /// Transfer completed successfully
    Completed,
    /// Transfer failed; surfaced as a diagnostic only
    Failed,
}

impl DownloadState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DownloadState::Pending => "pending",
            DownloadState::Downloading => "downloading",
            DownloadState::Completed => "completed",
            DownloadState::Failed => "failed",
        }
    }

    /// Whether the download is still tracked as in flight
    pub fn is_active(&self) -> bool {
        matches!(self, DownloadState::Pending | DownloadState::Downloading)
    }
}

impl std::fmt::Display for DownloadState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Download {
    pub id: String,
    pub url: String,
    pub file_path: String,
    pub file_name: String,
    pub total_bytes: Option<u64>,
    pub downloaded_bytes: u64,
    pub state: DownloadState,
    /// SHA-256 of the completed file
    pub hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Download {
    pub fn new(url: String, file_path: String, file_name: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            url,
            file_path,
            file_name,
            total_bytes: None,
            downloaded_bytes: 0,
            state: DownloadState::Pending,
            hash: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Progress as a percentage (0-100)
    pub fn progress(&self) -> f64 {
        match self.total_bytes {
            Some(total) if total > 0 => {
                (self.downloaded_bytes as f64 / total as f64 * 100.0).min(100.0)
            }
            _ => 0.0,
        }
    }
}
