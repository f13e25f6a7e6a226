//! JSON file storage implementation
//!
//! The schedule is a small JSON object mapping store identifiers to ISO-8601
//! timestamps. Writes go to a sibling temp file which then replaces the
//! snapshot, so readers never observe a partial document.

use crate::storage::traits::{ScheduleState, ScheduleStore, StorageError, StorageResult};
use chrono::{DateTime, NaiveDateTime, Utc};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// JSON document backend
pub struct JsonScheduleStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process
    write_lock: Mutex<()>,
}

impl JsonScheduleStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_snapshot(&self) -> ScheduleState {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return ScheduleState::new(),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    "Could not read schedule state, starting empty: {}",
                    e
                );
                return ScheduleState::new();
            }
        };

        let raw: BTreeMap<String, String> = match serde_json::from_str(&content) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    "Schedule state is corrupt, starting empty: {}",
                    e
                );
                return ScheduleState::new();
            }
        };

        raw.into_iter()
            .filter_map(|(store, stamp)| match parse_timestamp(&stamp) {
                Some(at) => Some((store, at)),
                None => {
                    tracing::warn!(
                        store = %store,
                        "Ignoring unparseable schedule timestamp '{}'",
                        stamp
                    );
                    None
                }
            })
            .collect()
    }

    fn write_snapshot(&self, state: &ScheduleState) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let raw: BTreeMap<&str, String> = state
            .iter()
            .map(|(store, at)| (store.as_str(), at.to_rfc3339()))
            .collect();
        let body = serde_json::to_string_pretty(&raw)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        let tmp_path = self.temp_path();
        {
            let mut file = std::fs::File::create(&tmp_path)?;
            file.write_all(body.as_bytes())?;
            file.sync_all()?;
        }

        if let Err(e) = std::fs::rename(&tmp_path, &self.path) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(e.into());
        }

        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "schedule".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl ScheduleStore for JsonScheduleStore {
    fn load(&self) -> StorageResult<ScheduleState> {
        Ok(self.read_snapshot())
    }

    fn record(&self, store_id: &str, at: DateTime<Utc>) -> StorageResult<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| StorageError::LockPoisoned)?;

        let mut state = self.read_snapshot();
        state.insert(store_id.to_string(), at);
        self.write_snapshot(&state)?;

        tracing::debug!(store = %store_id, "Schedule state updated");
        Ok(())
    }
}

/// Accepts RFC 3339 as well as naive ISO-8601 timestamps (taken as UTC)
fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(value) {
        return Some(at.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonScheduleStore::new(dir.path().join("meta/state.json"));
        assert!(store.load().unwrap().is_empty());
        assert_eq!(store.last_indexed("any").unwrap(), None);
    }

    #[test]
    fn test_record_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("meta/state.json");
        let at = Utc.with_ymd_and_hms(2025, 1, 1, 12, 34, 56).unwrap();

        JsonScheduleStore::new(&path).record("storeA", at).unwrap();

        // A fresh instance sees the persisted value
        let reopened = JsonScheduleStore::new(&path);
        assert_eq!(reopened.last_indexed("storeA").unwrap(), Some(at));
        assert!(!dir.path().join("meta/state.json.tmp").exists());
    }

    #[test]
    fn test_record_keeps_other_stores() {
        let dir = TempDir::new().unwrap();
        let store = JsonScheduleStore::new(dir.path().join("state.json"));
        let first = Utc::now() - Duration::days(3);
        let second = Utc::now();

        store.record("storeA", first).unwrap();
        store.record("storeB", second).unwrap();
        store.record("storeA", second).unwrap();

        let state = store.load().unwrap();
        assert_eq!(state.len(), 2);
        assert_eq!(state["storeA"], second);
        assert_eq!(state["storeB"], second);
    }

    #[test]
    fn test_corrupt_file_is_reset() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = JsonScheduleStore::new(&path);
        assert!(store.load().unwrap().is_empty());

        // Recording overwrites the corrupt document
        store.record("storeA", Utc::now()).unwrap();
        assert_eq!(store.load().unwrap().len(), 1);
    }

    #[test]
    fn test_reads_naive_timestamps() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(
            &path,
            r#"{ "storeA": "2025-01-01T12:34:56.789012", "storeB": "garbage" }"#,
        )
        .unwrap();

        let state = JsonScheduleStore::new(&path).load().unwrap();
        assert_eq!(state.len(), 1);
        assert_eq!(
            state["storeA"].format("%Y-%m-%d %H:%M:%S").to_string(),
            "2025-01-01 12:34:56"
        );
    }
}
