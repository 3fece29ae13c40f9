//! Data structures produced by collection and consumed by evaluation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One metric observed for one job.
///
/// The pair `(job, metric_name)` is unique within a collection run. Records are
/// built once by the collector and treated as read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricRecord {
    pub job: String,
    pub metric_name: String,
    /// Label names seen on this metric for this job, in display order
    pub labels: Vec<String>,
    /// Number of distinct series for this metric and job
    pub cardinality: u64,
    /// Distinct value count per label, only present with enhanced collection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_label_cardinality: Option<BTreeMap<String, u64>>,
}

impl MetricRecord {
    /// Creates a record without per-label cardinality.
    pub fn new(
        job: impl Into<String>,
        metric_name: impl Into<String>,
        labels: Vec<String>,
        cardinality: u64,
    ) -> Self {
        Self {
            job: job.into(),
            metric_name: metric_name.into(),
            labels,
            cardinality,
            per_label_cardinality: None,
        }
    }

    /// Attaches per-label cardinality. Empty maps are stored as absent.
    pub fn with_per_label_cardinality(mut self, values: BTreeMap<String, u64>) -> Self {
        self.per_label_cardinality = if values.is_empty() {
            None
        } else {
            Some(values)
        };
        self
    }

    /// Number of distinct label names on the metric.
    pub fn label_count(&self) -> usize {
        self.labels.len()
    }
}

/// Remote operation that failed during collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionOperation {
    FetchJobs,
    FetchCardinality,
    FetchLabels,
}

impl CollectionOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionOperation::FetchJobs => "fetch_jobs",
            CollectionOperation::FetchCardinality => "fetch_cardinality",
            CollectionOperation::FetchLabels => "fetch_labels",
        }
    }
}

impl fmt::Display for CollectionOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A soft error recorded for one metric (and optionally one job).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionFailure {
    pub metric_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job: Option<String>,
    pub operation: CollectionOperation,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl CollectionFailure {
    pub fn new(
        metric_name: impl Into<String>,
        job: Option<String>,
        operation: CollectionOperation,
        message: impl Into<String>,
    ) -> Self {
        Self {
            metric_name: metric_name.into(),
            job,
            operation,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Result of one collection run.
///
/// Records and failures are in completion order, which is not deterministic.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionOutcome {
    pub records: Vec<MetricRecord>,
    pub errors: Vec<CollectionFailure>,
    /// Size of the metric-name catalog returned by the backend
    pub metrics_discovered: usize,
    /// True when the run stopped early because it was cancelled
    pub cancelled: bool,
}

impl CollectionOutcome {
    /// Groups records by job name, each group sorted by metric name.
    pub fn records_by_job(&self) -> BTreeMap<&str, Vec<&MetricRecord>> {
        group_by_job(&self.records)
    }
}

/// Groups records by job name, each group sorted by metric name.
pub fn group_by_job(records: &[MetricRecord]) -> BTreeMap<&str, Vec<&MetricRecord>> {
    let mut grouped: BTreeMap<&str, Vec<&MetricRecord>> = BTreeMap::new();
    for record in records {
        grouped.entry(record.job.as_str()).or_default().push(record);
    }
    for records in grouped.values_mut() {
        records.sort_by(|a, b| a.metric_name.cmp(&b.metric_name));
    }
    grouped
}
