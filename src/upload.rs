//! Manual upload of local files into a store
//!
//! Validates every file, uploads the accepted ones, waits for indexing, and
//! reports what was discarded and why.

use crate::backend::{index_files, BackendError, IndexingBackend};
use crate::filter::FileValidator;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// A file left out of an upload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscardedFile {
    pub filename: String,
    pub reason: String,
    pub size_mb: Option<f64>,
}

/// Result of [`upload_files`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadReport {
    pub store: String,
    /// File names that passed validation and were indexed
    pub accepted: Vec<String>,
    pub discarded: Vec<DiscardedFile>,
}

/// Validates `paths` and indexes the accepted files into `store`
///
/// # Errors
///
/// Returns the backend error if uploading or waiting fails. Rejected files
/// are never an error; they are listed in [`UploadReport::discarded`].
pub async fn upload_files(
    backend: &dyn IndexingBackend,
    validator: &FileValidator,
    store: &str,
    paths: &[PathBuf],
) -> Result<UploadReport, BackendError> {
    let mut accepted_paths = Vec::new();
    let mut discarded = Vec::new();

    for path in paths {
        let outcome = validator.validate_path(path);
        match outcome.reason {
            None => accepted_paths.push(path.clone()),
            Some(reason) => {
                tracing::info!(path = %path.display(), "Discarding file: {}", reason);
                discarded.push(DiscardedFile {
                    filename: display_name(path),
                    reason: reason.to_string(),
                    size_mb: outcome.size_mb,
                });
            }
        }
    }

    if accepted_paths.is_empty() {
        tracing::warn!(store, "No valid files to upload");
    } else {
        index_files(backend, store, &accepted_paths).await?;
    }

    Ok(UploadReport {
        store: store.to_string(),
        accepted: accepted_paths.iter().map(|p| display_name(p)).collect(),
        discarded,
    })
}

/// Regular files directly inside `dir`, sorted by name
pub fn collect_dir(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{OperationHandle, QueryAnswer};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct CountingBackend {
        uploaded: Mutex<Vec<PathBuf>>,
    }

    #[async_trait]
    impl IndexingBackend for CountingBackend {
        async fn create_store(&self, display_name: &str) -> Result<String, BackendError> {
            Ok(display_name.to_string())
        }

        async fn upload(
            &self,
            _store_id: &str,
            paths: &[PathBuf],
        ) -> Result<Vec<OperationHandle>, BackendError> {
            self.uploaded.lock().unwrap().extend(paths.iter().cloned());
            Ok(paths
                .iter()
                .map(|p| OperationHandle(format!("op/{}", p.display())))
                .collect())
        }

        async fn wait(&self, _handle: &OperationHandle) -> Result<(), BackendError> {
            Ok(())
        }

        async fn query(
            &self,
            _store_id: &str,
            _text: &str,
            _system_instruction: &str,
        ) -> Result<QueryAnswer, BackendError> {
            unreachable!()
        }
    }

    #[tokio::test]
    async fn test_upload_reports_discarded() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("ley.pdf"), b"pdf").unwrap();
        std::fs::write(dir.path().join("tabla.xlsx"), b"xlsx").unwrap();
        std::fs::write(dir.path().join("README"), b"readme").unwrap();

        let backend = CountingBackend::default();
        let paths = collect_dir(dir.path()).unwrap();
        let report = upload_files(&backend, &FileValidator::default(), "store-1", &paths)
            .await
            .unwrap();

        assert_eq!(report.store, "store-1");
        assert_eq!(report.accepted, vec!["ley.pdf"]);
        assert_eq!(report.discarded.len(), 2);
        assert_eq!(report.discarded[0].filename, "README");
        assert_eq!(report.discarded[0].reason, "UNSUPPORTED_EXTENSION: NO_EXT");
        assert_eq!(report.discarded[1].reason, "UNSUPPORTED_EXTENSION: .xlsx");
        assert_eq!(report.discarded[1].size_mb, Some(0.01));
        assert_eq!(backend.uploaded.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_nothing_valid_skips_backend() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.csv"), b"1,2").unwrap();

        let backend = CountingBackend::default();
        let paths = collect_dir(dir.path()).unwrap();
        let report = upload_files(&backend, &FileValidator::default(), "s", &paths)
            .await
            .unwrap();

        assert!(report.accepted.is_empty());
        assert!(backend.uploaded.lock().unwrap().is_empty());
    }
}
