//! Remote query client for Prometheus-compatible backends.
//!
//! The collector talks to the backend only through [`MetricsBackend`], so tests
//! and alternative backends can stand in for [`PrometheusClient`].
//!
//! # Retry policy
//! Every request is attempted once plus `retry_count` more times. Transport
//! failures and HTTP 502/503/504 are retried after `attempt * backoff_unit`.
//! HTTP 429 sleeps for `rate_limit_cooldown` and is then returned as
//! [`QueryError::RateLimited`] without further attempts. Every other non-2xx
//! status is returned immediately.

mod config;
mod error;
mod prometheus;
pub mod queries;


use async_trait::async_trait;
use std::collections::BTreeMap;

pub use config::{ClientConfig, Credentials};
pub use error::QueryError;
pub use prometheus::PrometheusClient;

/// Read-only queries the collector needs from a metrics backend.
///
/// `filter` is an optional label-matcher fragment appended to every selector.
#[async_trait]
pub trait MetricsBackend: Send + Sync {
    /// Returns every metric name known to the backend.
    async fn metric_names(&self, filter: Option<&str>) -> Result<Vec<String>, QueryError>;

    /// Returns the jobs exposing `metric` at unix time `at`.
    async fn jobs_for_metric(
        &self,
        metric: &str,
        filter: Option<&str>,
        at: i64,
    ) -> Result<Vec<String>, QueryError>;

    /// Returns the number of series of `metric` for `job` at unix time `at`.
    async fn cardinality(
        &self,
        metric: &str,
        job: &str,
        filter: Option<&str>,
        at: i64,
    ) -> Result<u64, QueryError>;

    /// Returns the sorted label names (excluding `__name__`) of `metric` for `job`.
    async fn label_names(
        &self,
        metric: &str,
        job: &str,
        filter: Option<&str>,
    ) -> Result<Vec<String>, QueryError>;

    /// Returns the distinct value count per label of `metric` for `job`.
    ///
    /// Only available on backends exposing a cardinality-analysis API.
    async fn label_cardinality(
        &self,
        metric: &str,
        job: &str,
        labels: &[String],
        filter: Option<&str>,
    ) -> Result<BTreeMap<String, u64>, QueryError>;
}
