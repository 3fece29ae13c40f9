//! Three-tier bounded collection of metric records.

use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::CollectionConfig;
use super::sink::{CollectionSink, Progress};
use crate::client::MetricsBackend;
use crate::error::{Result, ScoreError};
use crate::models::{CollectionFailure, CollectionOperation, CollectionOutcome, MetricRecord};

/// Builds the metric inventory of a backend.
///
/// Only a failure to fetch the metric-name catalog fails the run. Every other
/// backend failure becomes a [`CollectionFailure`] in the outcome.
pub struct Collector<B> {
    backend: Arc<B>,
    config: CollectionConfig,
}

/// State shared by every task of one run.
struct CollectionRun<B> {
    backend: Arc<B>,
    filter: Option<String>,
    evaluation_time: i64,
    job_concurrency: usize,
    collect_label_cardinality: bool,
    label_permits: Semaphore,
    sink: CollectionSink,
    progress: Progress,
    cancel: CancellationToken,
}

impl<B: MetricsBackend + 'static> Collector<B> {
    pub fn new(backend: B, config: CollectionConfig) -> Self {
        Self::from_shared(Arc::new(backend), config)
    }

    pub fn from_shared(backend: Arc<B>, config: CollectionConfig) -> Self {
        Self { backend, config }
    }

    pub fn config(&self) -> &CollectionConfig {
        &self.config
    }

    /// Runs a full collection.
    ///
    /// When `cancel` fires, no new metric or job is started, in-flight
    /// requests are abandoned, and the partial outcome is returned with
    /// `cancelled` set.
    ///
    /// # Errors
    /// Returns an error if the metric-name catalog cannot be fetched, or if
    /// cancellation happens before it is.
    pub async fn collect(&self, cancel: &CancellationToken) -> Result<CollectionOutcome> {
        let filter = self.config.query_filter.as_deref();
        if let Some(filter) = filter {
            info!("Using query filter: {}", filter);
        }

        info!("Fetching metric names...");
        let metric_names = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(ScoreError::cancelled("collection stopped before metric names were fetched"));
            }
            result = self.backend.metric_names(filter) => {
                result.map_err(|e| ScoreError::remote("Failed to fetch metric names", e))?
            }
        };
        let metrics_discovered = metric_names.len();
        info!("Found {} metrics", metrics_discovered);

        let run = Arc::new(CollectionRun {
            backend: Arc::clone(&self.backend),
            filter: self.config.query_filter.clone(),
            evaluation_time: chrono::Utc::now().timestamp(),
            job_concurrency: self.config.job_concurrency,
            collect_label_cardinality: self.config.collect_label_cardinality,
            label_permits: Semaphore::new(self.config.label_cardinality_concurrency),
            sink: CollectionSink::default(),
            progress: Progress::new(metrics_discovered, self.config.progress_interval),
            cancel: cancel.clone(),
        });

        let metric_permits = Arc::new(Semaphore::new(self.config.metric_concurrency));
        let mut tasks = Vec::with_capacity(metrics_discovered);
        for metric in metric_names {
            if cancel.is_cancelled() {
                break;
            }
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                permit = Arc::clone(&metric_permits).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };
            let run = Arc::clone(&run);
            tasks.push(tokio::spawn(async move {
                let _permit = permit;
                run.process_metric(metric).await;
            }));
        }

        for result in join_all(tasks).await {
            if let Err(e) = result {
                error!("Metric collection task failed: {}", e);
            }
        }

        let (records, errors) = run.sink.take();
        let cancelled = cancel.is_cancelled();
        if cancelled {
            warn!(
                "Collection cancelled after {}/{} metrics",
                run.progress.processed(),
                metrics_discovered
            );
        }
        info!(
            "Collection complete: {} metric-job records, {} errors",
            records.len(),
            errors.len()
        );

        Ok(CollectionOutcome {
            records,
            errors,
            metrics_discovered,
            cancelled,
        })
    }
}

impl<B: MetricsBackend> CollectionRun<B> {
    fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    /// Resolves `future` unless the run is cancelled first.
    async fn unless_cancelled<T>(&self, future: impl Future<Output = T>) -> Option<T> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            value = future => Some(value),
        }
    }

    fn record_failure(
        &self,
        metric: &str,
        job: Option<&str>,
        operation: CollectionOperation,
        message: String,
    ) {
        warn!(
            metric,
            job = job.unwrap_or("-"),
            operation = operation.as_str(),
            "{}",
            message
        );
        self.sink.push_error(CollectionFailure::new(
            metric,
            job.map(str::to_string),
            operation,
            message,
        ));
    }

    async fn process_metric(&self, metric: String) {
        let jobs = self
            .unless_cancelled(
                self.backend
                    .jobs_for_metric(&metric, self.filter(), self.evaluation_time),
            )
            .await;

        match jobs {
            None => return,
            Some(Err(e)) => {
                self.record_failure(&metric, None, CollectionOperation::FetchJobs, e.to_string())
            }
            Some(Ok(jobs)) if jobs.is_empty() => debug!(metric = %metric, "No jobs expose metric"),
            Some(Ok(jobs)) => {
                let job_permits = Semaphore::new(self.job_concurrency);
                join_all(
                    jobs.into_iter()
                        .map(|job| self.process_job(&metric, job, &job_permits)),
                )
                .await;
            }
        }

        self.progress.tick();
    }

    async fn process_job(&self, metric: &str, job: String, job_permits: &Semaphore) {
        let Some(Ok(permit)) = self.unless_cancelled(job_permits.acquire()).await else {
            return;
        };

        let cardinality = match self
            .unless_cancelled(self.backend.cardinality(
                metric,
                &job,
                self.filter(),
                self.evaluation_time,
            ))
            .await
        {
            None => return,
            Some(Ok(cardinality)) => cardinality,
            Some(Err(e)) => {
                self.record_failure(
                    metric,
                    Some(&job),
                    CollectionOperation::FetchCardinality,
                    e.to_string(),
                );
                return;
            }
        };

        let labels = match self
            .unless_cancelled(self.backend.label_names(metric, &job, self.filter()))
            .await
        {
            None => return,
            Some(Ok(labels)) => labels,
            Some(Err(e)) => {
                self.record_failure(
                    metric,
                    Some(&job),
                    CollectionOperation::FetchLabels,
                    e.to_string(),
                );
                return;
            }
        };
        drop(permit);

        let mut record = MetricRecord::new(job, metric, labels, cardinality);
        if self.collect_label_cardinality && !record.labels.is_empty() {
            if let Some(values) = self.fetch_label_cardinality(&record).await {
                record = record.with_per_label_cardinality(values);
            }
        }
        self.sink.push_record(record);
    }

    /// Per-label value counts for a record; any failure degrades to `None`.
    async fn fetch_label_cardinality(
        &self,
        record: &MetricRecord,
    ) -> Option<std::collections::BTreeMap<String, u64>> {
        let _permit = self
            .unless_cancelled(self.label_permits.acquire())
            .await?
            .ok()?;

        let result = self
            .unless_cancelled(self.backend.label_cardinality(
                &record.metric_name,
                &record.job,
                &record.labels,
                self.filter(),
            ))
            .await?;

        match result {
            Ok(values) => Some(values),
            Err(e) => {
                warn!(
                    "Failed to get label cardinality for {}/{}: {}",
                    record.metric_name, record.job, e
                );
                None
            }
        }
    }
}
