//! Download manager
//!
//! Tracks intercepted downloads in memory and streams each transfer to the
//! downloads directory on the tokio runtime.

use futures_util::StreamExt;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::download::{Download, DownloadState};
use crate::error::DownloadError;
use crate::Result;

pub struct DownloadManager {
    /// In-memory download registry
    downloads: Arc<RwLock<HashMap<String, Download>>>,
    /// Default download directory
    downloads_dir: PathBuf,
    client: reqwest::Client,
}

impl DownloadManager {
    pub fn new(downloads_dir: PathBuf) -> Self {
        Self {
            downloads: Arc::new(RwLock::new(HashMap::new())),
            downloads_dir,
            client: reqwest::Client::new(),
        }
    }

    pub fn downloads_dir(&self) -> &Path {
        &self.downloads_dir
    }

    /// Intercept a download: record it and start the transfer. Must be
    /// called within a tokio runtime. The returned record is a snapshot;
    /// the registry tracks progress until the transfer completes or fails.
    pub fn begin(&self, url: Url, suggested_filename: &str) -> Download {
        let file_name = sanitize_file_name(suggested_filename);
        let destination = self.downloads_dir.join(&file_name);
        let download = Download::new(
            url.to_string(),
            destination.to_string_lossy().to_string(),
            file_name,
        );

        self.downloads
            .write()
            .insert(download.id.clone(), download.clone());

        tracing::info!(
            download_id = %download.id,
            url = %download.url,
            destination = %download.file_path,
            "Intercepted download"
        );

        let manager = self.clone();
        let id = download.id.clone();
        tokio::spawn(async move {
            manager.update(&id, |d| d.state = DownloadState::Downloading);

            match manager.transfer(&id, url, destination).await {
                Ok((hash, bytes)) => {
                    manager.update(&id, |d| {
                        d.state = DownloadState::Completed;
                        d.downloaded_bytes = bytes;
                        d.hash = Some(hash);
                        d.completed_at = Some(chrono::Utc::now());
                    });
                    tracing::info!(download_id = %id, bytes, "Download completed");
                }
                Err(e) => {
                    // Diagnostic only; browsing continues
                    manager.update(&id, |d| d.state = DownloadState::Failed);
                    tracing::warn!(download_id = %id, error = %e, "Download failed");
                }
            }
        });

        download
    }

    async fn transfer(&self, id: &str, url: Url, destination: PathBuf) -> Result<(String, u64)> {
        let response = self.client.get(url).send().await?.error_for_status()?;

        if let Some(total) = response.content_length() {
            self.update(id, |d| d.total_bytes = Some(total));
        }

        let mut file = prepare_destination(&destination).await?;
        let mut hasher = Sha256::new();
        let mut downloaded: u64 = 0;

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            hasher.update(&chunk);
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;
            self.update(id, |d| d.downloaded_bytes = downloaded);
        }

        file.flush().await?;

        let hash = hasher
            .finalize()
            .iter()
            .map(|byte| format!("{byte:02x}"))
            .collect();

        Ok((hash, downloaded))
    }

    pub fn get(&self, id: &str) -> Result<Download> {
        self.downloads
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| DownloadError::NotFound(id.to_string()))
    }

    pub fn list(&self) -> Vec<Download> {
        self.downloads.read().values().cloned().collect()
    }

    pub fn active(&self) -> Vec<Download> {
        self.downloads
            .read()
            .values()
            .filter(|d| d.state.is_active())
            .cloned()
            .collect()
    }

    fn update(&self, id: &str, mutate: impl FnOnce(&mut Download)) {
        if let Some(download) = self.downloads.write().get_mut(id) {
            mutate(download);
        }
    }
}

impl Clone for DownloadManager {
    fn clone(&self) -> Self {
        Self {
            downloads: Arc::clone(&self.downloads),
            downloads_dir: self.downloads_dir.clone(),
            client: self.client.clone(),
        }
    }
}

/// Create (or truncate) the destination file; a same-named existing file
/// is overwritten.
async fn prepare_destination(destination: &Path) -> Result<tokio::fs::File> {
    if let Some(parent) = destination.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    Ok(tokio::fs::File::create(destination).await?)
}

pub fn sanitize_file_name(file_name: &str) -> String {
    let name = Path::new(file_name)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("download")
        .trim();

    if name.is_empty() {
        "download".to_string()
    } else {
        name.to_string()
    }
}
