//! Output module for run reports and status listings
//!
//! This module handles:
//! - Human-readable run summaries printed by the CLI
//! - Upload reports and query answers
//! - Schedule status (when each store was last indexed)

mod report;
mod status;

pub use report::{
    format_query_answer, format_run_summary, format_upload_report, print_query_answer,
    print_run_summary, print_upload_report,
};
pub use status::{load_schedule_status, print_schedule_status, StoreStatus};
