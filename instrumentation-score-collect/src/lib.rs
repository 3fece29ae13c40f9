//! Library module for instrumentation-score-collect
//!
//! This module exposes the CLI surface and the collection workflow for
//! testing purposes. The binary entry point is in main.rs.

pub mod collect;
pub mod output;

use clap::{Args, Parser};
use instrumentation_score_core::{client::ClientConfig, collector::CollectionConfig};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Fallback environment variable for the backend URL
pub const PROMETHEUS_URL_ENV: &str = "PROMETHEUS_URL";

/// CLI argument structure
#[derive(Parser, Debug)]
#[command(name = "instrumentation-score-collect")]
#[command(about = "Metric inventory collection from a Prometheus-compatible backend")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = "
Instrumentation Score Collector - per-job metric inventory

Queries a Prometheus-compatible backend for every metric name, the jobs
exposing it, its series count and its label names, and writes one
pipe-delimited record file per job.

OUTPUT:
  <output-dir>/job_metrics_<timestamp>/<job>.txt
  <output-dir>/metrics_errors_<timestamp>.txt   (only when queries failed)

EXAMPLES:
  instrumentation-score-collect --url http://localhost:9090
  url=https://mimir.example.com/prometheus login=user:token instrumentation-score-collect --collect-label-cardinality
  instrumentation-score-collect --url http://localhost:9090 --additional-query-filters 'namespace=\"prod\"'
")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Backend base URL
    #[arg(
        long,
        env = "url",
        help = "Prometheus-compatible backend URL (falls back to PROMETHEUS_URL)"
    )]
    pub url: Option<String>,

    /// Basic-auth credentials
    #[arg(
        long,
        env = "login",
        hide_env_values = true,
        help = "Basic-auth credentials as user:password"
    )]
    pub login: Option<String>,

    /// PromQL label matchers added to every selector
    #[arg(long, help = "Label matchers added to every query, e.g. 'env=\"prod\"'")]
    pub additional_query_filters: Option<String>,

    /// Retries after the first attempt for transient failures
    #[arg(
        long,
        default_value_t = ClientConfig::DEFAULT_RETRY_COUNT,
        help = "Retries for transient query failures"
    )]
    pub retry_failures_count: u32,

    /// Metrics processed at once
    #[arg(
        long,
        env = "CONCURRENT_METRICS",
        default_value_t = CollectionConfig::DEFAULT_METRIC_CONCURRENCY
    )]
    pub concurrent_metrics: usize,

    /// Jobs of one metric queried at once
    #[arg(
        long,
        env = "CONCURRENT_JOBS",
        default_value_t = CollectionConfig::DEFAULT_JOB_CONCURRENCY
    )]
    pub concurrent_jobs: usize,

    /// Per-label cardinality requests in flight
    #[arg(
        long,
        env = "CONCURRENT_LABEL_CARDINALITY",
        default_value_t = CollectionConfig::DEFAULT_LABEL_CARDINALITY_CONCURRENCY
    )]
    pub concurrent_label_cardinality: usize,

    /// Enable per-label cardinality collection
    #[arg(
        long,
        help = "Collect per-label value counts (requires the Mimir cardinality API)"
    )]
    pub collect_label_cardinality: bool,

    /// Per-request timeout
    #[arg(
        long,
        default_value_t = ClientConfig::DEFAULT_REQUEST_TIMEOUT.as_secs(),
        help = "Per-request timeout in seconds"
    )]
    pub request_timeout_secs: u64,

    /// Output directory
    #[arg(
        short,
        long,
        default_value = ".",
        help = "Directory receiving the job files and error report"
    )]
    pub output_dir: PathBuf,
}

#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Increase verbosity
    #[arg(
        short,
        long,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv, -vvv)"
    )]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, help = "Suppress all output except errors")]
    pub quiet: bool,
}

/// Where the backend URL came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlSource {
    /// `--url` flag or the `url` environment variable
    Argument,
    /// The `PROMETHEUS_URL` fallback variable
    Environment,
}

/// Resolves the backend URL from the CLI, then from `PROMETHEUS_URL`.
///
/// # Errors
///
/// Returns an error if no source yields a valid http(s) URL. The message
/// never contains the URL itself.
pub fn get_backend_url(explicit: Option<&str>) -> Result<(String, UrlSource), String> {
    if let Some(url) = explicit.map(str::trim).filter(|u| !u.is_empty()) {
        if validate_backend_url(url) {
            return Ok((url.to_string(), UrlSource::Argument));
        }
        return Err(
            "Invalid backend URL: expected an http:// or https:// URL with a host".to_string(),
        );
    }

    if let Ok(url) = env::var(PROMETHEUS_URL_ENV) {
        let url = url.trim();
        if validate_backend_url(url) {
            return Ok((url.to_string(), UrlSource::Environment));
        }
        return Err(format!(
            "Invalid backend URL in {}: expected an http:// or https:// URL with a host",
            PROMETHEUS_URL_ENV
        ));
    }

    Err(
        "Backend URL required. Use --url or set the url or PROMETHEUS_URL environment variable."
            .to_string(),
    )
}

/// Validates backend URL format without exposing credentials
#[must_use]
pub fn validate_backend_url(url: &str) -> bool {
    if url.trim().is_empty() {
        return false;
    }

    url::Url::parse(url).is_ok_and(|parsed_url| {
        matches!(parsed_url.scheme(), "http" | "https") && parsed_url.host_str().is_some()
    })
}

impl Cli {
    /// Client settings for `base_url`.
    pub fn client_config(&self, base_url: &str) -> ClientConfig {
        let mut config = ClientConfig::new(base_url)
            .with_retry_count(self.retry_failures_count)
            .with_request_timeout(Duration::from_secs(self.request_timeout_secs));
        if let Some(login) = &self.login {
            config = config.with_login(login);
        }
        config
    }

    /// Collection settings. Zero concurrency values fall back to defaults.
    pub fn collection_config(&self) -> CollectionConfig {
        let mut config = CollectionConfig::default();
        if let Some(filter) = &self.additional_query_filters {
            config = config.with_query_filter(filter);
        }
        config
            .with_metric_concurrency(self.concurrent_metrics)
            .with_job_concurrency(self.concurrent_jobs)
            .with_label_cardinality_concurrency(self.concurrent_label_cardinality)
            .with_collect_label_cardinality(self.collect_label_cardinality)
    }
}
