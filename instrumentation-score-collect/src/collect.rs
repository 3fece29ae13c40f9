//! Collection workflow.
//!
//! Resolves the backend, runs the collector under a cancellation token and
//! writes the per-job record files and the error report.

use chrono::Utc;
use instrumentation_score_core::{
    MetricsBackend, PrometheusClient, Result, ScoreError,
    collector::{CollectionConfig, Collector},
    error::redact_url,
};
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::output::{OutputLayout, WrittenOutput, save_outcome};
use crate::{Cli, UrlSource, get_backend_url};

/// Summary of one collection run.
#[derive(Debug)]
pub struct CollectionReport {
    pub layout: OutputLayout,
    pub output: WrittenOutput,
    pub metrics_discovered: usize,
    pub records: usize,
    pub errors: usize,
    pub cancelled: bool,
}

/// Runs a collection against the backend configured on the command line.
pub async fn run_collection(cli: &Cli, cancel: &CancellationToken) -> Result<CollectionReport> {
    let (url, source) =
        get_backend_url(cli.url.as_deref()).map_err(ScoreError::configuration)?;

    info!("Starting metric collection...");
    info!(
        "Target: {} ({})",
        redact_url(&url),
        match source {
            UrlSource::Argument => "--url",
            UrlSource::Environment => crate::PROMETHEUS_URL_ENV,
        }
    );

    let client = PrometheusClient::new(cli.client_config(&url)).map_err(|e| {
        error!("Failed to create backend client: {}", e);
        e
    })?;

    collect_with_backend(client, cli.collection_config(), &cli.output_dir, cancel).await
}

/// Collects from `backend` and writes the results under `output_dir`.
///
/// A cancelled run still writes what it gathered; the report says so.
pub async fn collect_with_backend<B: MetricsBackend + 'static>(
    backend: B,
    config: CollectionConfig,
    output_dir: &Path,
    cancel: &CancellationToken,
) -> Result<CollectionReport> {
    let layout = OutputLayout::new(output_dir, Utc::now());
    info!("Output: {}", layout.job_dir.display());

    let collector = Collector::new(backend, config);
    let outcome = collector.collect(cancel).await.map_err(|e| {
        error!("Collection failed: {}", e);
        e
    })?;

    if outcome.cancelled {
        warn!("Collection was cancelled, writing partial results");
    }

    let output = save_outcome(&layout, &outcome).await?;

    Ok(CollectionReport {
        layout,
        output,
        metrics_discovered: outcome.metrics_discovered,
        records: outcome.records.len(),
        errors: outcome.errors.len(),
        cancelled: outcome.cancelled,
    })
}

/// Prints the run summary to stdout.
pub fn print_summary(report: &CollectionReport) {
    if report.cancelled {
        println!("Metric collection was interrupted");
    } else {
        println!("Metric collection completed successfully");
    }
    println!("Metrics discovered: {}", report.metrics_discovered);
    println!("Records collected: {}", report.records);
    println!(
        "Job files: {} in {}",
        report.output.job_files,
        report.layout.job_dir.display()
    );
    if report.output.skipped_jobs > 0 {
        println!("Jobs not written: {}", report.output.skipped_jobs);
    }
    match &report.output.error_report {
        Some(path) => println!("Errors: {} (see {})", report.errors, path.display()),
        None => println!("Errors: 0"),
    }
}
