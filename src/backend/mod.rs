//! Hosted indexing backend
//!
//! The orchestrator only needs four capabilities from a retrieval service:
//! create a store, upload files into it, wait for the resulting indexing
//! operations, and answer grounded queries. [`IndexingBackend`] names them;
//! [`GeminiBackend`] implements them over the Gemini File Search REST API.

mod gemini;

pub use gemini::GeminiBackend;

use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by an indexing backend
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("HTTP error talking to backend: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Operation {operation} failed: {message}")]
    OperationFailed { operation: String, message: String },

    #[error("Operation {operation} still running after {waited_secs}s")]
    Timeout { operation: String, waited_secs: u64 },

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("API key variable {0} is not set")]
    MissingApiKey(String),
}

/// Opaque name of a long-running backend operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationHandle(pub String);

impl OperationHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OperationHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// How long and how often to poll an operation
#[derive(Debug, Clone, Copy)]
pub struct WaitPolicy {
    pub poll_interval: Duration,
    pub max_wait: Duration,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            max_wait: Duration::from_secs(600),
        }
    }
}

/// A document passage that grounded an answer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Source {
    /// Document title, or its URI when untitled
    pub filename: String,
    pub page: Option<u32>,
    pub snippet: String,
}

/// Answer to a grounded query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryAnswer {
    pub answer: String,
    /// Deduplicated by filename, first occurrence wins
    pub sources: Vec<Source>,
}

/// Remote retrieval service the pipeline indexes into
#[async_trait]
pub trait IndexingBackend: Send + Sync {
    /// Creates a store and returns its identifier
    async fn create_store(&self, display_name: &str) -> Result<String, BackendError>;

    /// Starts indexing each file into `store_id`
    ///
    /// A file that fails to upload is logged and skipped; the handles of the
    /// uploads that started are returned.
    async fn upload(
        &self,
        store_id: &str,
        paths: &[PathBuf],
    ) -> Result<Vec<OperationHandle>, BackendError>;

    /// Blocks until the operation is done, fails, or the wait budget runs out
    async fn wait(&self, handle: &OperationHandle) -> Result<(), BackendError>;

    /// Answers `text` using only documents in `store_id`
    async fn query(
        &self,
        store_id: &str,
        text: &str,
        system_instruction: &str,
    ) -> Result<QueryAnswer, BackendError>;
}

/// Uploads `paths` into `store_id` and waits for every operation
///
/// Returns the number of files whose indexing completed. A batch where any
/// file failed to upload is an error, reported after the operations that did
/// start have been waited on. Any failed operation is an error too.
pub async fn index_files(
    backend: &dyn IndexingBackend,
    store_id: &str,
    paths: &[PathBuf],
) -> Result<usize, BackendError> {
    if paths.is_empty() {
        return Ok(0);
    }

    let handles = backend.upload(store_id, paths).await?;
    if handles.is_empty() {
        return Err(BackendError::OperationFailed {
            operation: format!("upload to {}", store_id),
            message: format!("none of {} files could be uploaded", paths.len()),
        });
    }

    for handle in &handles {
        tracing::info!(store = store_id, operation = %handle, "Waiting for indexing");
        backend.wait(handle).await?;
    }

    if handles.len() < paths.len() {
        return Err(BackendError::OperationFailed {
            operation: format!("upload to {}", store_id),
            message: format!(
                "{} of {} files could not be uploaded",
                paths.len() - handles.len(),
                paths.len()
            ),
        });
    }

    Ok(handles.len())
}
