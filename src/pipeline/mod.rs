//! Scrape-and-index pipeline
//!
//! This module contains:
//! - The indexing scheduler (count-or-staleness policy)
//! - The orchestrator driving one complete run over all sources

mod coordinator;
mod scheduler;

pub use coordinator::{Orchestrator, RunSummary, SourceReport, StoreAction, StoreReport};
pub use scheduler::IndexScheduler;
