//! Report formatting
//!
//! Each report has a `format_*` function producing the text and a `print_*`
//! wrapper writing it to stdout.

use crate::backend::QueryAnswer;
use crate::pipeline::{RunSummary, StoreAction};
use crate::upload::UploadReport;
use std::fmt;

/// Formats a run summary
///
/// # Arguments
///
/// * `summary` - The outcome of an orchestrator run
///
/// # Returns
///
/// A multi-line report with one line per source and per store
pub fn format_run_summary(summary: &RunSummary) -> String {
    RunSummaryText(summary).to_string()
}

pub fn print_run_summary(summary: &RunSummary) {
    print!("{}", RunSummaryText(summary));
}

pub fn format_upload_report(report: &UploadReport) -> String {
    UploadReportText(report).to_string()
}

pub fn print_upload_report(report: &UploadReport) {
    print!("{}", UploadReportText(report));
}

pub fn format_query_answer(answer: &QueryAnswer) -> String {
    QueryAnswerText(answer).to_string()
}

pub fn print_query_answer(answer: &QueryAnswer) {
    print!("{}", QueryAnswerText(answer));
}

struct RunSummaryText<'a>(&'a RunSummary);

impl fmt::Display for RunSummaryText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let summary = self.0;

        writeln!(f, "=== Scrape Run Summary ===\n")?;
        writeln!(f, "Overview:")?;
        writeln!(f, "  Sources: {}", summary.sources.len())?;
        writeln!(f, "  Failed sources: {}", summary.failed_sources())?;
        writeln!(f, "  New files downloaded: {}", summary.downloaded())?;
        writeln!(f, "  Stores indexed: {}", summary.indexed_stores())?;
        writeln!(f, "  Failed stores: {}", summary.failed_stores())?;
        writeln!(f)?;

        if !summary.sources.is_empty() {
            writeln!(f, "Sources:")?;
            for source in &summary.sources {
                let store = source.store.as_deref().unwrap_or("-");
                match &source.error {
                    None => writeln!(
                        f,
                        "  {} [{}] -> {}: {} links, {} new",
                        source.source_id,
                        source.category,
                        store,
                        source.links_found,
                        source.downloaded.len()
                    )?,
                    Some(error) => writeln!(
                        f,
                        "  {} [{}] -> {}: FAILED ({})",
                        source.source_id, source.category, store, error
                    )?,
                }
            }
            writeln!(f)?;
        }

        if !summary.stores.is_empty() {
            writeln!(f, "Stores:")?;
            for store in &summary.stores {
                let action = match &store.action {
                    StoreAction::Indexed { files } => format!("indexed {} files", files),
                    StoreAction::Deferred { waiting } => {
                        format!("deferred, {} files waiting", waiting)
                    }
                    StoreAction::Idle => "nothing to index".to_string(),
                    StoreAction::Failed { error } => format!("FAILED ({})", error),
                };
                writeln!(
                    f,
                    "  {} ({}): {}/{} valid, {}",
                    store.store,
                    store.categories.join(", "),
                    store.valid,
                    store.candidates,
                    action
                )?;
            }
        }

        Ok(())
    }
}

struct UploadReportText<'a>(&'a UploadReport);

impl fmt::Display for UploadReportText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;

        writeln!(f, "Store: {}", report.store)?;
        writeln!(f, "Accepted ({}):", report.accepted.len())?;
        for name in &report.accepted {
            writeln!(f, "  - {}", name)?;
        }

        if !report.discarded.is_empty() {
            writeln!(f, "Discarded ({}):", report.discarded.len())?;
            for file in &report.discarded {
                writeln!(f, "  - {}: {}", file.filename, file.reason)?;
            }
        }

        Ok(())
    }
}

struct QueryAnswerText<'a>(&'a QueryAnswer);

impl fmt::Display for QueryAnswerText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let answer = self.0;

        writeln!(f, "{}", answer.answer.trim_end())?;

        if !answer.sources.is_empty() {
            writeln!(f, "\nSources:")?;
            for source in &answer.sources {
                match source.page {
                    Some(page) => writeln!(f, "  - {} (p. {})", source.filename, page)?,
                    None => writeln!(f, "  - {}", source.filename)?,
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Source;
    use crate::pipeline::{SourceReport, StoreReport};
    use crate::upload::DiscardedFile;
    use std::path::PathBuf;

    #[test]
    fn test_run_summary_lines() {
        let summary = RunSummary {
            sources: vec![
                SourceReport {
                    source_id: "laws".to_string(),
                    category: "leyes".to_string(),
                    store: Some("storeA".to_string()),
                    links_found: 4,
                    downloaded: vec![PathBuf::from("a.pdf")],
                    error: None,
                },
                SourceReport {
                    source_id: "news".to_string(),
                    category: "news".to_string(),
                    store: None,
                    links_found: 0,
                    downloaded: Vec::new(),
                    error: Some("boom".to_string()),
                },
            ],
            stores: vec![StoreReport {
                store: "storeA".to_string(),
                categories: vec!["leyes".to_string()],
                candidates: 3,
                valid: 2,
                action: StoreAction::Deferred { waiting: 2 },
            }],
        };

        let text = format_run_summary(&summary);
        assert!(text.contains("Failed sources: 1"));
        assert!(text.contains("laws [leyes] -> storeA: 4 links, 1 new"));
        assert!(text.contains("news [news] -> -: FAILED (boom)"));
        assert!(text.contains("storeA (leyes): 2/3 valid, deferred, 2 files waiting"));
    }

    #[test]
    fn test_upload_report() {
        let report = UploadReport {
            store: "s1".to_string(),
            accepted: vec!["a.pdf".to_string()],
            discarded: vec![DiscardedFile {
                filename: "b.xlsx".to_string(),
                reason: "UNSUPPORTED_EXTENSION: .xlsx".to_string(),
                size_mb: Some(0.01),
            }],
        };
        let text = format_upload_report(&report);
        assert!(text.contains("Accepted (1):"));
        assert!(text.contains("b.xlsx: UNSUPPORTED_EXTENSION: .xlsx"));
    }

    #[test]
    fn test_query_answer() {
        let answer = QueryAnswer {
            answer: "Twenty percent.\n".to_string(),
            sources: vec![Source {
                filename: "ley.pdf".to_string(),
                page: None,
                snippet: String::new(),
            }],
        };
        assert_eq!(
            format_query_answer(&answer),
            "Twenty percent.\n\nSources:\n  - ley.pdf\n"
        );
    }
}
