//! Per-job record files on disk.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::codec::{format_records, parse_records};
use crate::error::{Result, ScoreError};
use crate::models::{MetricRecord, group_by_job};

/// Extension of job record files.
pub const JOB_FILE_EXTENSION: &str = "txt";

/// Replaces characters that are unsafe in file names with `_`.
pub fn sanitize_job_name(job: &str) -> String {
    job.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect()
}

/// File name used for a job's records.
pub fn job_file_name(job: &str) -> String {
    format!("{}.{}", sanitize_job_name(job), JOB_FILE_EXTENSION)
}

/// Reads and parses a job file. Malformed lines are dropped.
pub async fn read_job_file(path: &Path) -> Result<Vec<MetricRecord>> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ScoreError::io(format!("Failed to read {}", path.display()), e))?;
    Ok(parse_records(&text, &path.display().to_string()))
}

/// Writes records to `path`, replacing any existing file.
pub async fn write_job_file(path: &Path, records: &[&MetricRecord]) -> Result<()> {
    tokio::fs::write(path, format_records(records.iter().copied()))
        .await
        .map_err(|e| ScoreError::io(format!("Failed to write to {}", path.display()), e))
}

/// Outcome of writing one file per job.
#[derive(Debug, Default)]
pub struct JobFilesSummary {
    pub written: Vec<PathBuf>,
    /// Jobs whose file could not be written, with the reason
    pub skipped: Vec<(String, String)>,
}

/// Writes one file per job into `dir`, grouping `records` by job.
///
/// A job whose file cannot be written is skipped with a warning; the others
/// are still written.
pub async fn write_job_files(dir: &Path, records: &[MetricRecord]) -> Result<JobFilesSummary> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| ScoreError::io(format!("Failed to create {}", dir.display()), e))?;

    let mut summary = JobFilesSummary::default();
    for (job, job_records) in group_by_job(records) {
        let path = dir.join(job_file_name(job));
        match write_job_file(&path, &job_records).await {
            Ok(()) => {
                debug!(
                    "Wrote {} records for job {} to {}",
                    job_records.len(),
                    job,
                    path.display()
                );
                summary.written.push(path);
            }
            Err(e) => {
                warn!("Skipping job {}: {}", job, e);
                summary.skipped.push((job.to_string(), e.to_string()));
            }
        }
    }
    Ok(summary)
}

/// Lists job files in `dir`, sorted by path.
pub async fn list_job_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| ScoreError::io(format!("Failed to read directory {}", dir.display()), e))?;

    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| ScoreError::io(format!("Failed to read directory {}", dir.display()), e))?
    {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == JOB_FILE_EXTENSION) && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
