//! Storage traits and error types
//!
//! This module defines the trait interface for schedule persistence backends
//! and associated error types.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use thiserror::Error;

/// Last completed indexing time per destination store
pub type ScheduleState = BTreeMap<String, DateTime<Utc>>;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for schedule persistence backends
///
/// Implementations must be safe to share between tasks and must never leave
/// a half-written snapshot behind: a crash during `record` keeps either the
/// old or the new state for every store.
pub trait ScheduleStore: Send + Sync {
    /// Loads the full schedule snapshot
    ///
    /// A missing snapshot is an empty state, not an error.
    fn load(&self) -> StorageResult<ScheduleState>;

    /// Gets the last indexing time of one store
    fn last_indexed(&self, store_id: &str) -> StorageResult<Option<DateTime<Utc>>> {
        Ok(self.load()?.get(store_id).copied())
    }

    /// Overwrites the last indexing time of one store
    fn record(&self, store_id: &str, at: DateTime<Utc>) -> StorageResult<()>;
}
