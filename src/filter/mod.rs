//! File validation before indexing
//!
//! A cheap gate that looks only at byte length and file extension:
//!
//! 1. Files larger than the configured maximum are rejected as oversized
//! 2. Files whose extension is not supported are rejected
//! 3. Everything else is accepted
//!
//! Validation never modifies or deletes the file it inspects.

use crate::config::FilterConfig;
use crate::url::extension_of;
use std::fmt;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Extensions the indexing backend accepts
pub const SUPPORTED_EXTENSIONS: &[&str] = &[".pdf", ".txt", ".md", ".docx"];

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Why a file was rejected
#[derive(Debug, Clone, PartialEq)]
pub enum RejectReason {
    /// File exceeds the size limit
    Oversized { size_mb: f64, max_mb: f64 },

    /// Extension missing or not in [`SUPPORTED_EXTENSIONS`]
    UnsupportedType { extension: Option<String> },

    /// Size could not be measured (missing file, permission error)
    Unreadable { error: String },
}

impl RejectReason {
    /// Short machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::Oversized { .. } => "FILE_TOO_LARGE",
            Self::UnsupportedType { .. } => "UNSUPPORTED_EXTENSION",
            Self::Unreadable { .. } => "UNREADABLE",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Oversized { size_mb, max_mb } => {
                write!(f, "{}: {} MB > {} MB", self.code(), size_mb, max_mb)
            }
            Self::UnsupportedType { extension } => write!(
                f,
                "{}: {}",
                self.code(),
                extension.as_deref().unwrap_or("NO_EXT")
            ),
            Self::Unreadable { error } => write!(f, "{}: {}", self.code(), error),
        }
    }
}

/// Result of validating one file
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationOutcome {
    /// Reason for rejection; `None` means the file was accepted
    pub reason: Option<RejectReason>,

    /// Size in megabytes, ceiling-rounded to two decimals
    pub size_mb: Option<f64>,
}

impl ValidationOutcome {
    fn accepted(size_mb: f64) -> Self {
        Self {
            reason: None,
            size_mb: Some(size_mb),
        }
    }

    fn rejected(reason: RejectReason, size_mb: Option<f64>) -> Self {
        Self {
            reason: Some(reason),
            size_mb,
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.reason.is_none()
    }
}

/// Validates files by size and extension
#[derive(Debug, Clone)]
pub struct FileValidator {
    max_size_mb: f64,
}

impl Default for FileValidator {
    fn default() -> Self {
        Self::new(20.0)
    }
}

impl FileValidator {
    /// Creates a validator with the given size limit in megabytes
    pub fn new(max_size_mb: f64) -> Self {
        Self { max_size_mb }
    }

    pub fn from_config(config: &FilterConfig) -> Self {
        Self::new(config.max_file_size_mb)
    }

    pub fn max_size_mb(&self) -> f64 {
        self.max_size_mb
    }

    /// Validates a file on disk
    pub fn validate_path(&self, path: &Path) -> ValidationOutcome {
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        match std::fs::metadata(path) {
            Ok(meta) if meta.is_file() => self.decide(&filename, size_in_mb(meta.len())),
            Ok(_) => ValidationOutcome::rejected(
                RejectReason::Unreadable {
                    error: "not a regular file".to_string(),
                },
                None,
            ),
            Err(e) => ValidationOutcome::rejected(
                RejectReason::Unreadable {
                    error: e.to_string(),
                },
                None,
            ),
        }
    }

    /// Validates in-memory or streamed content
    ///
    /// The reader is measured by seeking to its end; its position is restored
    /// afterwards so the content can still be read in full.
    pub fn validate_reader<R: Read + Seek>(
        &self,
        filename: &str,
        reader: &mut R,
    ) -> ValidationOutcome {
        match measure(reader) {
            Ok(bytes) => self.decide(filename, size_in_mb(bytes)),
            Err(e) => ValidationOutcome::rejected(
                RejectReason::Unreadable {
                    error: e.to_string(),
                },
                None,
            ),
        }
    }

    /// Keeps only accepted files, logging every rejection
    pub fn filter_valid(&self, paths: &[PathBuf]) -> Vec<PathBuf> {
        paths
            .iter()
            .filter(|path| {
                let outcome = self.validate_path(path);
                match &outcome.reason {
                    None => true,
                    Some(reason) => {
                        tracing::info!(
                            path = %path.display(),
                            size_mb = ?outcome.size_mb,
                            "Discarding file: {}",
                            reason
                        );
                        false
                    }
                }
            })
            .cloned()
            .collect()
    }

    fn decide(&self, filename: &str, size_mb: f64) -> ValidationOutcome {
        if size_mb > self.max_size_mb {
            return ValidationOutcome::rejected(
                RejectReason::Oversized {
                    size_mb,
                    max_mb: self.max_size_mb,
                },
                Some(size_mb),
            );
        }

        match extension_of(filename) {
            Some(ext) if SUPPORTED_EXTENSIONS.contains(&ext.as_str()) => {
                ValidationOutcome::accepted(size_mb)
            }
            extension => ValidationOutcome::rejected(
                RejectReason::UnsupportedType { extension },
                Some(size_mb),
            ),
        }
    }
}

/// Byte length of a seekable stream, leaving its position untouched
fn measure<R: Seek>(reader: &mut R) -> std::io::Result<u64> {
    let original = reader.stream_position()?;
    let end = reader.seek(SeekFrom::End(0))?;
    reader.seek(SeekFrom::Start(original))?;
    Ok(end)
}

/// Converts bytes to megabytes, rounding up to two decimals
fn size_in_mb(bytes: u64) -> f64 {
    let mb = bytes as f64 / BYTES_PER_MB;
    (mb * 100.0).ceil() / 100.0
}
