//! Schedule status listing
//!
//! Shows, for every store referenced by the configured sources, when it was
//! last indexed and how many files are waiting in its categories.

use crate::config::SourceDefinition;
use crate::download::Downloader;
use crate::storage::ScheduleStore;
use crate::HarvestError;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};

/// Indexing status of one store
#[derive(Debug, Clone, PartialEq)]
pub struct StoreStatus {
    pub store: String,
    pub categories: Vec<String>,
    pub last_indexed: Option<DateTime<Utc>>,
    /// Files modified since the last indexing (not yet validated)
    pub pending: usize,
}

/// Collects the status of every resolvable store
///
/// Sources whose store cannot be resolved are listed under the
/// `"<unresolved>"` pseudo-store so they stay visible.
pub async fn load_schedule_status(
    sources: &[SourceDefinition],
    schedule: &dyn ScheduleStore,
    downloader: &Downloader,
) -> Result<Vec<StoreStatus>, HarvestError> {
    let state = schedule.load()?;

    let mut categories: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for source in sources {
        let store = source
            .resolve_store()
            .unwrap_or_else(|_| "<unresolved>".to_string());
        categories
            .entry(store)
            .or_default()
            .insert(source.category.clone());
    }

    let mut statuses = Vec::with_capacity(categories.len());
    for (store, cats) in categories {
        let last_indexed = state.get(&store).copied();
        let mut pending = 0;
        for category in &cats {
            pending += downloader.pending_files(category, last_indexed).await?.len();
        }
        statuses.push(StoreStatus {
            store,
            categories: cats.into_iter().collect(),
            last_indexed,
            pending,
        });
    }

    Ok(statuses)
}

pub fn print_schedule_status(statuses: &[StoreStatus]) {
    println!("=== Indexing Schedule ===\n");

    if statuses.is_empty() {
        println!("No stores configured.");
        return;
    }

    for status in statuses {
        let last = status
            .last_indexed
            .map(|at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "never".to_string());
        println!("{}:", status.store);
        println!("  Categories: {}", status.categories.join(", "));
        println!("  Last indexed: {}", last);
        println!("  Pending files: {}", status.pending);
    }
}
