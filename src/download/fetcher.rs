//! HTTP plumbing for page and document requests
//!
//! This module handles:
//! - Building the shared HTTP client with the configured user agent and timeout
//! - Streaming a response body to disk chunk by chunk

use crate::config::DownloadConfig;
use crate::download::DownloadError;
use futures_util::StreamExt;
use reqwest::Client;
use std::path::Path;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The download configuration (user agent, timeout)
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use doc_harvest::config::DownloadConfig;
/// use doc_harvest::download::build_http_client;
///
/// let client = build_http_client(&DownloadConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &DownloadConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.timeout_secs.min(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Streams a response body to `file`, returning the bytes written
///
/// The caller owns cleanup: on error the file may hold a partial body.
pub(crate) async fn stream_to_file(
    file: File,
    response: reqwest::Response,
    url: &str,
    file_path: &Path,
) -> Result<u64, DownloadError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| DownloadError::Http {
            url: url.to_string(),
            source: e,
        })?;

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| DownloadError::Io {
                path: file_path.to_path_buf(),
                source: e,
            })?;

        bytes_written += chunk.len() as u64;
    }

    writer.flush().await.map_err(|e| DownloadError::Io {
        path: file_path.to_path_buf(),
        source: e,
    })?;

    Ok(bytes_written)
}
