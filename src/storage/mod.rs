//! Storage module for persisting the indexing schedule
//!
//! The schedule maps each destination store to the time of its last
//! completed indexing run. It is the only memory of indexing history, so it
//! must survive restarts and never be left half-written.
//!
//! Two backends are available:
//! - `JsonScheduleStore`: a small JSON document replaced atomically on write
//! - `SqliteScheduleStore`: a single-table SQLite database

mod json;
mod schema;
mod sqlite;
mod traits;

pub use json::JsonScheduleStore;
pub use sqlite::SqliteScheduleStore;
pub use traits::{ScheduleState, ScheduleStore, StorageError, StorageResult};

use crate::config::{StateBackend, StateConfig};
use std::sync::Arc;

/// Opens the schedule backend selected in the configuration
pub fn open_schedule_store(config: &StateConfig) -> StorageResult<Arc<dyn ScheduleStore>> {
    match config.backend {
        StateBackend::Json => Ok(Arc::new(JsonScheduleStore::new(&config.path))),
        StateBackend::Sqlite => Ok(Arc::new(SqliteScheduleStore::new(&config.path)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    #[test]
    fn test_open_each_backend() {
        let dir = TempDir::new().unwrap();

        for (backend, name) in [
            (StateBackend::Json, "state.json"),
            (StateBackend::Sqlite, "state.db"),
        ] {
            let config = StateConfig {
                backend,
                path: dir.path().join(name),
            };
            let store = open_schedule_store(&config).unwrap();
            store.record("storeA", Utc::now()).unwrap();
            assert!(store.last_indexed("storeA").unwrap().is_some());
        }
    }
}
