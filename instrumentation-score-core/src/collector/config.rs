//! Collection run configuration.

use serde::{Deserialize, Serialize};

/// Concurrency and scope settings for a collection run.
///
/// The three concurrency widths bound independent semaphores: metrics being
/// processed, job queries per metric, and label-cardinality requests across the
/// whole run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionConfig {
    /// Label-matcher fragment added to every selector, e.g. `env="prod"`
    pub query_filter: Option<String>,
    /// Metrics processed at once
    pub metric_concurrency: usize,
    /// Job queries in flight per metric
    pub job_concurrency: usize,
    /// Label-cardinality requests in flight across the run
    pub label_cardinality_concurrency: usize,
    /// Fetch per-label value counts for every record with labels
    pub collect_label_cardinality: bool,
    /// Emit a progress line every N processed metrics
    pub progress_interval: usize,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            query_filter: None,
            metric_concurrency: Self::DEFAULT_METRIC_CONCURRENCY,
            job_concurrency: Self::DEFAULT_JOB_CONCURRENCY,
            label_cardinality_concurrency: Self::DEFAULT_LABEL_CARDINALITY_CONCURRENCY,
            collect_label_cardinality: false,
            progress_interval: Self::DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

fn positive_or_default(name: &str, value: usize, default: usize) -> usize {
    if value == 0 {
        tracing::warn!("{} must be greater than 0, using default {}", name, default);
        default
    } else {
        value
    }
}

impl CollectionConfig {
    pub const DEFAULT_PROGRESS_INTERVAL: usize = 50;
    pub const DEFAULT_METRIC_CONCURRENCY: usize = 5;
    pub const DEFAULT_JOB_CONCURRENCY: usize = 3;
    pub const DEFAULT_LABEL_CARDINALITY_CONCURRENCY: usize = 50;

    /// Creates a new collection config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the query filter. Blank filters are dropped.
    pub fn with_query_filter(mut self, filter: &str) -> Self {
        let filter = filter.trim();
        self.query_filter = (!filter.is_empty()).then(|| filter.to_string());
        self
    }

    /// Builder method to set how many metrics are processed at once.
    ///
    /// This and the other width setters replace 0 with the default.
    pub fn with_metric_concurrency(mut self, concurrency: usize) -> Self {
        self.metric_concurrency = positive_or_default(
            "metric_concurrency",
            concurrency,
            Self::DEFAULT_METRIC_CONCURRENCY,
        );
        self
    }

    /// Builder method to set how many jobs of one metric are queried at once.
    pub fn with_job_concurrency(mut self, concurrency: usize) -> Self {
        self.job_concurrency =
            positive_or_default("job_concurrency", concurrency, Self::DEFAULT_JOB_CONCURRENCY);
        self
    }

    /// Builder method to set the run-wide label-cardinality request limit.
    pub fn with_label_cardinality_concurrency(mut self, concurrency: usize) -> Self {
        self.label_cardinality_concurrency = positive_or_default(
            "label_cardinality_concurrency",
            concurrency,
            Self::DEFAULT_LABEL_CARDINALITY_CONCURRENCY,
        );
        self
    }

    /// Builder method to enable per-label cardinality collection.
    pub fn with_collect_label_cardinality(mut self, enabled: bool) -> Self {
        self.collect_label_cardinality = enabled;
        self
    }

    /// Builder method to set the progress reporting interval.
    pub fn with_progress_interval(mut self, interval: usize) -> Self {
        self.progress_interval =
            positive_or_default("progress_interval", interval, Self::DEFAULT_PROGRESS_INTERVAL);
        self
    }
}
