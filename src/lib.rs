//! Doc-Harvest: scrape, filter and index public documents for retrieval
//!
//! This crate collects document links from configured sources, downloads new
//! files into category folders, filters them by size and type, and decides
//! when accumulated files are worth submitting to a hosted retrieval store.

pub mod backend;
pub mod config;
pub mod download;
pub mod extract;
pub mod filter;
pub mod output;
pub mod pipeline;
pub mod prompt;
pub mod storage;
pub mod upload;
pub mod url;

use thiserror::Error;

/// Main error type for Doc-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Link extraction error: {0}")]
    Extract(#[from] extract::ExtractError),

    #[error("Download error: {0}")]
    Download(#[from] download::DownloadError),

    #[error("Indexing backend error: {0}")]
    Backend(#[from] backend::BackendError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Prompt error: {0}")]
    Prompt(#[from] prompt::PromptError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Source '{source_id}' has no destination store (set `store` or `store-env`)")]
    MissingStore { source_id: String },

    #[error("Environment variable {var} is not set for source '{source_id}'")]
    UnresolvedStore { source_id: String, var: String },
}

/// Result type alias for Doc-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::{Config, SourceDefinition};
pub use filter::{FileValidator, RejectReason, ValidationOutcome};
pub use pipeline::{IndexScheduler, Orchestrator, RunSummary};
