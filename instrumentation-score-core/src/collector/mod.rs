//! Collection orchestrator.
//!
//! Turns the backend's metric-name catalog into one [`MetricRecord`] per
//! metric and job, under three independent concurrency limits:
//!
//! 1. metrics processed at once (run-wide)
//! 2. jobs of a single metric queried at once (per metric)
//! 3. per-label cardinality requests in flight (run-wide)
//!
//! A failed job or label query is recorded as a soft error and never aborts
//! sibling work.
//!
//! # Example
//! ```rust,no_run
//! use instrumentation_score_core::client::{ClientConfig, PrometheusClient};
//! use instrumentation_score_core::collector::{CollectionConfig, Collector};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> instrumentation_score_core::Result<()> {
//! let client = PrometheusClient::new(ClientConfig::new("http://localhost:9090"))?;
//! let collector = Collector::new(client, CollectionConfig::default());
//! let outcome = collector.collect(&CancellationToken::new()).await?;
//! println!("{} records, {} errors", outcome.records.len(), outcome.errors.len());
//! # Ok(())
//! # }
//! ```
//!
//! [`MetricRecord`]: crate::models::MetricRecord

mod config;
mod orchestrator;
mod sink;


pub use config::CollectionConfig;
pub use orchestrator::Collector;
