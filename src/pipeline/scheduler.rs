//! Indexing scheduler
//!
//! Decides per store whether accumulated files justify an indexing run now.
//! Indexing is triggered when any of these hold (and there is at least one
//! file):
//!
//! | Condition | Default |
//! |-----------|---------|
//! | enough files waiting | 5 |
//! | store never indexed | |
//! | too long since the last run | 7 days |

use crate::config::ScraperConfig;
use crate::storage::{ScheduleStore, StorageResult};
use chrono::{DateTime, Duration, Utc};
use std::path::PathBuf;
use std::sync::Arc;

/// Count-or-staleness indexing policy backed by a persistent schedule
pub struct IndexScheduler {
    store: Arc<dyn ScheduleStore>,
    min_files: usize,
    max_wait: Duration,
}

impl IndexScheduler {
    pub fn new(store: Arc<dyn ScheduleStore>, min_files: usize, max_wait: Duration) -> Self {
        Self {
            store,
            min_files,
            max_wait,
        }
    }

    pub fn from_config(store: Arc<dyn ScheduleStore>, config: &ScraperConfig) -> Self {
        Self::new(
            store,
            config.min_files_to_index,
            Duration::days(i64::from(config.max_wait_days)),
        )
    }

    pub fn min_files(&self) -> usize {
        self.min_files
    }

    pub fn max_wait(&self) -> Duration {
        self.max_wait
    }

    /// Last completed indexing of `store_id`
    ///
    /// A schedule that cannot be read is logged and treated as "never indexed".
    pub fn last_indexed(&self, store_id: &str) -> Option<DateTime<Utc>> {
        match self.store.last_indexed(store_id) {
            Ok(at) => at,
            Err(e) => {
                tracing::warn!(store = store_id, "Cannot read indexing schedule: {}", e);
                None
            }
        }
    }

    /// Whether `files` should be indexed into `store_id` now
    pub fn should_index_now(&self, store_id: &str, files: &[PathBuf]) -> bool {
        self.should_index_at(store_id, files.len(), Utc::now())
    }

    /// Decision for `file_count` waiting files as of `now`
    pub fn should_index_at(&self, store_id: &str, file_count: usize, now: DateTime<Utc>) -> bool {
        if file_count == 0 {
            return false;
        }

        if file_count >= self.min_files {
            tracing::debug!(store = store_id, file_count, "Enough files to index");
            return true;
        }

        match self.last_indexed(store_id) {
            None => {
                tracing::debug!(store = store_id, "Store never indexed");
                true
            }
            Some(last) => {
                let elapsed = now - last;
                let due = elapsed >= self.max_wait;
                tracing::debug!(
                    store = store_id,
                    file_count,
                    elapsed_hours = elapsed.num_hours(),
                    due,
                    "Checked indexing staleness"
                );
                due
            }
        }
    }

    /// Records that `store_id` was indexed now
    pub fn record_indexed(&self, store_id: &str) -> StorageResult<DateTime<Utc>> {
        let now = Utc::now();
        self.store.record(store_id, now)?;
        tracing::info!(store = store_id, at = %now.to_rfc3339(), "Recorded indexing");
        Ok(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::JsonScheduleStore;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn scheduler(dir: &TempDir) -> IndexScheduler {
        let store = JsonScheduleStore::new(dir.path().join("meta.json"));
        IndexScheduler::new(Arc::new(store), 5, Duration::days(7))
    }

    fn files(n: usize) -> Vec<PathBuf> {
        (0..n).map(|i| PathBuf::from(format!("f{i}.pdf"))).collect()
    }

    #[test]
    fn test_no_files_never_indexes() {
        let dir = TempDir::new().unwrap();
        let s = scheduler(&dir);
        assert!(!s.should_index_now("storeA", &[]));

        s.store.record("storeA", Utc::now() - Duration::days(30)).unwrap();
        assert!(!s.should_index_now("storeA", &[]));
    }

    #[test]
    fn test_never_indexed_single_file() {
        let dir = TempDir::new().unwrap();
        let s = scheduler(&dir);
        assert!(s.should_index_now("storeA", &files(1)));
        assert!(s.should_index_now("storeA", &files(3)));
    }

    #[test]
    fn test_enough_files_recently_indexed() {
        let dir = TempDir::new().unwrap();
        let s = scheduler(&dir);
        s.record_indexed("storeA").unwrap();
        assert!(s.should_index_now("storeA", &files(5)));
        assert!(s.should_index_now("storeA", &files(6)));
    }

    #[test]
    fn test_few_files_recently_indexed() {
        let dir = TempDir::new().unwrap();
        let s = scheduler(&dir);
        let last = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        s.store.record("storeA", last).unwrap();

        let two_days_later = last + Duration::days(2);
        assert!(!s.should_index_at("storeA", 3, two_days_later));
    }

    #[test]
    fn test_few_files_stale_store() {
        let dir = TempDir::new().unwrap();
        let s = scheduler(&dir);
        let last = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        s.store.record("storeA", last).unwrap();

        assert!(s.should_index_at("storeA", 1, last + Duration::days(10)));
        assert!(s.should_index_at("storeA", 1, last + Duration::days(7)));
        assert!(!s.should_index_at("storeA", 1, last + Duration::days(7) - Duration::seconds(1)));
    }

    #[test]
    fn test_record_then_ask() {
        let dir = TempDir::new().unwrap();
        let s = scheduler(&dir);
        assert!(s.should_index_now("storeA", &files(1)));

        let at = s.record_indexed("storeA").unwrap();
        assert_eq!(s.last_indexed("storeA"), Some(at));
        assert!(!s.should_index_now("storeA", &files(4)));
    }

    #[test]
    fn test_stores_are_independent() {
        let dir = TempDir::new().unwrap();
        let s = scheduler(&dir);
        s.record_indexed("storeA").unwrap();
        assert!(!s.should_index_now("storeA", &files(1)));
        assert!(s.should_index_now("storeB", &files(1)));
    }

    #[test]
    fn test_from_config() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(JsonScheduleStore::new(dir.path().join("meta.json")));
        let s = IndexScheduler::from_config(store, &ScraperConfig::default());
        assert_eq!(s.min_files(), 5);
        assert_eq!(s.max_wait(), Duration::days(7));
    }
}
