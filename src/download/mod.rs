//! Document downloader
//!
//! Downloads each new document URL into `<data-root>/<category>/` under a
//! name derived from the URL (`<identifier>_<basename>`). A file already on
//! disk is the "already downloaded" marker, so repeated runs never fetch the
//! same URL twice and never overwrite anything.

mod fetcher;

pub use fetcher::build_http_client;

use crate::config::DownloadConfig;
use crate::url::{has_extension, target_filename, url_basename};
use chrono::{DateTime, Utc};
use reqwest::Client;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs::File;

/// Download failures
///
/// Only [`DownloadError::CreateDir`] and [`DownloadError::ReadDir`] escape
/// [`Downloader`]; per-URL failures are logged and the URL is skipped.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Cannot create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot list directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP error for {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status} downloading {url}")]
    Status { url: String, status: u16 },

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Downloads documents into category directories
#[derive(Debug, Clone)]
pub struct Downloader {
    client: Client,
    data_root: PathBuf,
    extensions: Vec<String>,
}

impl Downloader {
    pub fn new(client: Client, data_root: impl Into<PathBuf>, extensions: Vec<String>) -> Self {
        Self {
            client,
            data_root: data_root.into(),
            extensions,
        }
    }

    pub fn from_config(client: Client, config: &DownloadConfig) -> Self {
        Self::new(client, &config.data_root, config.extensions.clone())
    }

    pub fn data_root(&self) -> &Path {
        &self.data_root
    }

    /// Directory holding the files of a category
    pub fn category_dir(&self, category: &str) -> PathBuf {
        self.data_root.join(category)
    }

    /// Downloads the URLs not yet on disk and returns the newly created paths
    ///
    /// # Behavior
    ///
    /// - URLs are trimmed; blank URLs are ignored
    /// - URLs without a supported extension are skipped at debug level
    /// - A URL whose target file exists is skipped and not returned
    /// - A failed download (network, non-2xx, write error) removes the partial
    ///   file and is skipped
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::CreateDir`] if the category directory cannot
    /// be created. Nothing else aborts the batch.
    pub async fn download_new(
        &self,
        urls: &[String],
        category: &str,
    ) -> Result<Vec<PathBuf>, DownloadError> {
        let dir = self.category_dir(category);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| DownloadError::CreateDir {
                path: dir.clone(),
                source: e,
            })?;

        let mut created = Vec::new();
        for raw in urls {
            let url = raw.trim();
            if url.is_empty() {
                continue;
            }

            if !has_extension(&url_basename(url), &self.extensions) {
                tracing::debug!(category, "Skipping unsupported URL {}", url);
                continue;
            }

            let path = dir.join(target_filename(url));
            if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                tracing::debug!(path = %path.display(), "Already downloaded");
                continue;
            }

            match self.fetch_to(url, &path).await {
                Ok(bytes) => {
                    tracing::info!(category, path = %path.display(), bytes, "Downloaded {}", url);
                    created.push(path);
                }
                Err(e) => {
                    tracing::warn!(category, "Download failed, skipping: {}", e);
                }
            }
        }

        Ok(created)
    }

    /// Files in a category directory modified after `since`
    ///
    /// With `since = None` every file is returned. A missing directory yields
    /// an empty list. The result is sorted by path.
    pub async fn pending_files(
        &self,
        category: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<PathBuf>, DownloadError> {
        let dir = self.category_dir(category);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(DownloadError::ReadDir { path: dir, source: e }),
        };

        let mut files = Vec::new();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    return Err(DownloadError::ReadDir {
                        path: dir.clone(),
                        source: e,
                    })
                }
            };

            let meta = match entry.metadata().await {
                Ok(meta) if meta.is_file() => meta,
                _ => continue,
            };

            let is_pending = match since {
                None => true,
                Some(since) => meta
                    .modified()
                    .map(|mtime| DateTime::<Utc>::from(mtime) > since)
                    .unwrap_or(true),
            };

            if is_pending {
                files.push(entry.path());
            }
        }

        files.sort();
        Ok(files)
    }

    async fn fetch_to(&self, url: &str, path: &Path) -> Result<u64, DownloadError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DownloadError::Http {
                url: url.to_string(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let file = File::create(path).await.map_err(|e| DownloadError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        let result = fetcher::stream_to_file(file, response, url, path).await;
        if result.is_err() {
            tracing::debug!(path = %path.display(), "Removing partial file");
            let _ = tokio::fs::remove_file(path).await;
        }
        result
    }
}
