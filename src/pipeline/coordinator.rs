//! Scrape orchestrator - one complete scrape-and-index pass
//!
//! A run has two phases:
//!
//! 1. **Scrape**: every source is handled independently (bounded concurrency):
//!    resolve its store, extract links, download new files into its category.
//! 2. **Index**: results converge per destination store. Each store gathers
//!    new and pending files from the categories feeding it, validates them,
//!    asks the scheduler, and indexes when due.
//!
//! Failures stay at their unit: a broken source never stops other sources,
//! and a failing store never stops other stores.

use crate::backend::{index_files, IndexingBackend};
use crate::config::{check_source, SourceDefinition};
use crate::download::Downloader;
use crate::extract::LinkExtractor;
use crate::filter::FileValidator;
use crate::pipeline::scheduler::IndexScheduler;
use crate::HarvestError;
use futures_util::stream::{self, StreamExt};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// What happened to one source
#[derive(Debug, Clone)]
pub struct SourceReport {
    pub source_id: String,
    pub category: String,
    /// Resolved destination store, if resolution succeeded
    pub store: Option<String>,
    pub links_found: usize,
    pub downloaded: Vec<PathBuf>,
    pub error: Option<String>,
}

impl SourceReport {
    fn new(source: &SourceDefinition) -> Self {
        Self {
            source_id: source.id.clone(),
            category: source.category.clone(),
            store: None,
            links_found: 0,
            downloaded: Vec::new(),
            error: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Per-store decision for this run
#[derive(Debug, Clone, PartialEq)]
pub enum StoreAction {
    /// Files were indexed and the schedule updated
    Indexed { files: usize },
    /// Valid files are waiting for a later run
    Deferred { waiting: usize },
    /// No valid files to index
    Idle,
    /// Indexing or schedule persistence failed
    Failed { error: String },
}

/// What happened to one destination store
#[derive(Debug, Clone)]
pub struct StoreReport {
    pub store: String,
    pub categories: Vec<String>,
    /// New plus pending files considered
    pub candidates: usize,
    /// Files that passed validation
    pub valid: usize,
    pub action: StoreAction,
}

/// Outcome of a full run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// In source configuration order
    pub sources: Vec<SourceReport>,
    /// Sorted by store identifier
    pub stores: Vec<StoreReport>,
}

impl RunSummary {
    pub fn downloaded(&self) -> usize {
        self.sources.iter().map(|s| s.downloaded.len()).sum()
    }

    pub fn failed_sources(&self) -> usize {
        self.sources.iter().filter(|s| !s.is_ok()).count()
    }

    pub fn indexed_stores(&self) -> usize {
        self.stores
            .iter()
            .filter(|s| matches!(s.action, StoreAction::Indexed { .. }))
            .count()
    }

    pub fn failed_stores(&self) -> usize {
        self.stores
            .iter()
            .filter(|s| matches!(s.action, StoreAction::Failed { .. }))
            .count()
    }

    pub fn has_failures(&self) -> bool {
        self.failed_sources() > 0 || self.failed_stores() > 0
    }
}

#[derive(Debug, Default)]
struct StoreBatch {
    categories: BTreeSet<String>,
    new_files: Vec<PathBuf>,
}

/// Runs scrape-and-index passes over a set of sources
pub struct Orchestrator {
    extractor: Arc<dyn LinkExtractor>,
    downloader: Downloader,
    validator: FileValidator,
    scheduler: IndexScheduler,
    backend: Arc<dyn IndexingBackend>,
    max_concurrent_sources: usize,
    store_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl Orchestrator {
    /// Creates an orchestrator from its collaborators
    ///
    /// # Arguments
    ///
    /// * `extractor` - Finds document links for a source
    /// * `downloader` - Fetches new documents into category directories
    /// * `validator` - Size and type gate applied before indexing
    /// * `scheduler` - Decides when a store is due and records indexing
    /// * `backend` - Remote retrieval service
    pub fn new(
        extractor: Arc<dyn LinkExtractor>,
        downloader: Downloader,
        validator: FileValidator,
        scheduler: IndexScheduler,
        backend: Arc<dyn IndexingBackend>,
    ) -> Self {
        Self {
            extractor,
            downloader,
            validator,
            scheduler,
            backend,
            max_concurrent_sources: 4,
            store_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Sets how many sources are scraped at once (at least 1)
    pub fn with_concurrency(mut self, max_concurrent_sources: usize) -> Self {
        self.max_concurrent_sources = max_concurrent_sources.max(1);
        self
    }

    pub fn scheduler(&self) -> &IndexScheduler {
        &self.scheduler
    }

    /// Executes one complete run
    ///
    /// # Errors
    ///
    /// Only an unusable data root aborts the run. Every other failure is
    /// recorded in the returned [`RunSummary`].
    pub async fn run(&self, sources: &[SourceDefinition]) -> Result<RunSummary, HarvestError> {
        tokio::fs::create_dir_all(self.downloader.data_root()).await?;

        tracing::info!(
            sources = sources.len(),
            concurrency = self.max_concurrent_sources,
            "Starting scrape run"
        );

        let owners = category_owners(sources);
        let owners = &owners;
        let mut indexed_reports: Vec<(usize, SourceReport)> = stream::iter(sources.iter().enumerate())
            .map(|(position, source)| async move {
                (position, self.scrape_source(source, owners).await)
            })
            .buffer_unordered(self.max_concurrent_sources)
            .collect()
            .await;
        indexed_reports.sort_by_key(|(position, _)| *position);
        let source_reports: Vec<SourceReport> =
            indexed_reports.into_iter().map(|(_, report)| report).collect();

        let mut batches: BTreeMap<String, StoreBatch> = BTreeMap::new();
        for report in &source_reports {
            if let Some(store) = &report.store {
                let batch = batches.entry(store.clone()).or_default();
                batch.categories.insert(report.category.clone());
                batch.new_files.extend(report.downloaded.iter().cloned());
            }
        }

        let mut store_reports: Vec<StoreReport> = stream::iter(batches)
            .map(|(store, batch)| self.index_store(store, batch))
            .buffer_unordered(self.max_concurrent_sources)
            .collect()
            .await;
        store_reports.sort_by(|a, b| a.store.cmp(&b.store));

        let summary = RunSummary {
            sources: source_reports,
            stores: store_reports,
        };

        tracing::info!(
            downloaded = summary.downloaded(),
            failed_sources = summary.failed_sources(),
            indexed_stores = summary.indexed_stores(),
            failed_stores = summary.failed_stores(),
            "Scrape run finished"
        );

        Ok(summary)
    }

    async fn scrape_source(
        &self,
        source: &SourceDefinition,
        owners: &HashMap<String, String>,
    ) -> SourceReport {
        let mut report = SourceReport::new(source);

        if let Err(e) = check_source(source) {
            tracing::error!(source = %source.id, "Skipping misconfigured source: {}", e);
            report.error = Some(e.to_string());
            return report;
        }

        let store = match source.resolve_store() {
            Ok(store) => store,
            Err(e) => {
                tracing::error!(source = %source.id, "Dropping source results: {}", e);
                report.error = Some(e.to_string());
                return report;
            }
        };

        if let Some(owner) = owners.get(&source.category).filter(|owner| **owner != store) {
            let error = format!(
                "category '{}' already feeds store '{}', not '{}'",
                source.category, owner, store
            );
            tracing::error!(source = %source.id, "Skipping source: {}", error);
            report.error = Some(error);
            return report;
        }
        report.store = Some(store);

        let links = match self.extractor.extract(source).await {
            Ok(links) => links,
            Err(e) => {
                tracing::error!(source = %source.id, "Link extraction failed: {}", e);
                report.error = Some(e.to_string());
                return report;
            }
        };
        report.links_found = links.len();

        match self.downloader.download_new(&links, &source.category).await {
            Ok(downloaded) => {
                tracing::info!(
                    source = %source.id,
                    category = %source.category,
                    "New files downloaded: {}",
                    downloaded.len()
                );
                report.downloaded = downloaded;
            }
            Err(e) => {
                tracing::error!(source = %source.id, "Download failed: {}", e);
                report.error = Some(e.to_string());
            }
        }

        report
    }

    fn store_lock(&self, store: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .store_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        locks.entry(store.to_string()).or_default().clone()
    }

    async fn index_store(&self, store: String, batch: StoreBatch) -> StoreReport {
        let lock = self.store_lock(&store);
        let _guard = lock.lock().await;

        let since = self.scheduler.last_indexed(&store);
        let mut candidates: BTreeSet<PathBuf> = batch.new_files.into_iter().collect();
        for category in &batch.categories {
            match self.downloader.pending_files(category, since).await {
                Ok(pending) => candidates.extend(pending),
                Err(e) => {
                    tracing::warn!(store = %store, category = %category, "Cannot list pending files: {}", e)
                }
            }
        }

        let candidates: Vec<PathBuf> = candidates.into_iter().collect();
        let valid = self.validator.filter_valid(&candidates);

        let mut report = StoreReport {
            store: store.clone(),
            categories: batch.categories.into_iter().collect(),
            candidates: candidates.len(),
            valid: valid.len(),
            action: StoreAction::Idle,
        };

        if valid.is_empty() {
            tracing::info!(store = %store, "No valid files to index");
            return report;
        }

        if !self.scheduler.should_index_now(&store, &valid) {
            tracing::info!(
                store = %store,
                waiting = valid.len(),
                "Not indexing yet, files kept for a later run"
            );
            report.action = StoreAction::Deferred {
                waiting: valid.len(),
            };
            return report;
        }

        tracing::info!(store = %store, files = valid.len(), "Indexing files");
        let indexed = match index_files(self.backend.as_ref(), &store, &valid).await {
            Ok(indexed) => indexed,
            Err(e) => {
                tracing::error!(store = %store, "Indexing failed: {}", e);
                report.action = StoreAction::Failed {
                    error: e.to_string(),
                };
                return report;
            }
        };

        report.action = match self.scheduler.record_indexed(&store) {
            Ok(_) => StoreAction::Indexed { files: indexed },
            Err(e) => {
                tracing::error!(store = %store, "Indexed but could not record schedule: {}", e);
                StoreAction::Failed {
                    error: e.to_string(),
                }
            }
        };

        report
    }
}

/// Store fed by each category: the first usable source naming it wins
///
/// Pending files are rescanned per category, so a category feeding a second
/// store would leak its files into both.
fn category_owners(sources: &[SourceDefinition]) -> HashMap<String, String> {
    let mut owners = HashMap::new();
    for source in sources {
        if check_source(source).is_err() {
            continue;
        }
        if let Ok(store) = source.resolve_store() {
            owners.entry(source.category.clone()).or_insert(store);
        }
    }
    owners
}
