//! Core library for Instrumentation Score.
//!
//! This crate provides the collection pipeline, the record store, the rule
//! engine and the score calculator shared between the collector and the
//! evaluator binaries.
//!
//! # Pipeline
//! - [`collector`] inventories every metric and job on a Prometheus-compatible
//!   backend under bounded concurrency, tolerating per-job failures
//! - [`records`] reads and writes the per-job pipe-delimited record files
//! - [`rules`] loads and compiles the declarative YAML rule document
//! - [`engine`] evaluates records against the rules and computes the
//!   weighted score
//!
//! # Credential Handling
//! Backend credentials are only ever held by the HTTP client. URLs are passed
//! through [`error::redact_url`] before they reach a log line or an error.

pub mod client;
pub mod collector;
pub mod engine;
pub mod error;
pub mod logging;
pub mod models;
pub mod records;
pub mod rules;

// Re-export commonly used types
pub use client::{ClientConfig, Credentials, MetricsBackend, PrometheusClient, QueryError};
pub use collector::{CollectionConfig, Collector};
pub use engine::{
    EvaluationReport, ExclusionReason, JobOutcome, JobScore, RuleEngine, RuleResult,
    ScoreCategory, score,
};
pub use error::{Result, ScoreError};
pub use models::{CollectionFailure, CollectionOperation, CollectionOutcome, MetricRecord};
pub use rules::{Impact, RuleSet};
