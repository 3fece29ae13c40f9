//! File output for collection results.
//!
//! Writes one record file per job into a timestamped directory and, when any
//! query failed, a pipe-delimited error report next to it.

use chrono::{DateTime, Utc};
use instrumentation_score_core::{
    CollectionFailure, CollectionOutcome, Result, ScoreError, records::write_job_files,
};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Header line of the error report
pub const ERROR_REPORT_HEADER: &str = "TIMESTAMP|METRIC_NAME|OPERATION|ERROR";

const RUN_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const ERROR_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Paths produced by one collection run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    pub job_dir: PathBuf,
    pub error_file: PathBuf,
}

impl OutputLayout {
    pub fn new(output_dir: &Path, started_at: DateTime<Utc>) -> Self {
        let stamp = started_at.format(RUN_TIMESTAMP_FORMAT);
        Self {
            job_dir: output_dir.join(format!("job_metrics_{}", stamp)),
            error_file: output_dir.join(format!("metrics_errors_{}.txt", stamp)),
        }
    }
}

/// What was written to disk.
#[derive(Debug, Default)]
pub struct WrittenOutput {
    pub job_files: usize,
    pub skipped_jobs: usize,
    pub error_report: Option<PathBuf>,
}

/// Formats failures as the error report body, header included.
///
/// Pipes and newlines inside error messages are replaced so that every
/// failure stays on one four-column line.
pub fn format_error_report(errors: &[CollectionFailure]) -> String {
    let mut body = String::from(ERROR_REPORT_HEADER);
    body.push('\n');
    for failure in errors {
        let message: String = failure
            .message
            .chars()
            .map(|c| match c {
                '|' => '/',
                '\n' | '\r' => ' ',
                _ => c,
            })
            .collect();
        body.push_str(&format!(
            "{}|{}|{}|{}\n",
            failure.timestamp.format(ERROR_TIMESTAMP_FORMAT),
            failure.metric_name,
            failure.operation,
            message
        ));
    }
    body
}

/// Writes the error report to `path`.
pub async fn write_error_report(path: &Path, errors: &[CollectionFailure]) -> Result<()> {
    tokio::fs::write(path, format_error_report(errors))
        .await
        .map_err(|e| ScoreError::io(format!("Failed to write to {}", path.display()), e))
}

/// Writes job files and the error report for a finished (or cancelled) run.
pub async fn save_outcome(layout: &OutputLayout, outcome: &CollectionOutcome) -> Result<WrittenOutput> {
    let summary = write_job_files(&layout.job_dir, &outcome.records).await?;
    info!(
        "Wrote {} job files to {}",
        summary.written.len(),
        layout.job_dir.display()
    );
    if !summary.skipped.is_empty() {
        warn!("{} jobs could not be written", summary.skipped.len());
    }

    let error_report = if outcome.errors.is_empty() {
        None
    } else {
        write_error_report(&layout.error_file, &outcome.errors).await?;
        info!(
            "Wrote {} collection errors to {}",
            outcome.errors.len(),
            layout.error_file.display()
        );
        Some(layout.error_file.clone())
    };

    Ok(WrittenOutput {
        job_files: summary.written.len(),
        skipped_jobs: summary.skipped.len(),
        error_report,
    })
}
