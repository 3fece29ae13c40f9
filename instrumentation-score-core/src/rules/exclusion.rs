//! Job and metric exclusion.

use regex::Regex;
use std::collections::BTreeSet;

use super::definition::ExclusionEntry;
use crate::error::{Result, ScoreError};
use crate::models::MetricRecord;

/// A compiled exclusion entry.
#[derive(Debug, Clone)]
pub struct Exclusion {
    job: Option<String>,
    pattern: Option<Regex>,
    metrics: BTreeSet<String>,
}

impl Exclusion {
    /// Compiles an entry. Blank `job` and `job_name_pattern` values count as
    /// absent.
    pub fn compile(entry: &ExclusionEntry) -> Result<Self> {
        let non_blank = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let pattern = non_blank(&entry.job_name_pattern)
            .map(|pattern| {
                Regex::new(&pattern).map_err(|e| {
                    ScoreError::rule_definition(format!(
                        "invalid job_name_pattern '{}' in exclusion_list: {}",
                        pattern, e
                    ))
                })
            })
            .transpose()?;

        Ok(Self {
            job: non_blank(&entry.job),
            pattern,
            metrics: entry.metrics.iter().cloned().collect(),
        })
    }

    /// Whether this entry applies to `job`: the name equals `job` or matches
    /// `job_name_pattern`. An entry with neither matches nothing.
    pub fn matches_job(&self, job: &str) -> bool {
        self.job.as_deref().is_some_and(|exact| exact == job)
            || self.pattern.as_ref().is_some_and(|pattern| pattern.is_match(job))
    }

    /// Whether the entry drops the whole job rather than single metrics.
    pub fn covers_whole_job(&self) -> bool {
        self.metrics.is_empty()
    }
}

/// The exclusion list of a rule set.
#[derive(Debug, Clone, Default)]
pub struct ExclusionFilter {
    entries: Vec<Exclusion>,
}

impl ExclusionFilter {
    /// Wraps already compiled entries.
    pub fn new(entries: Vec<Exclusion>) -> Self {
        Self { entries }
    }

    /// Compiles every entry, failing on the first invalid pattern.
    pub fn compile(entries: &[ExclusionEntry]) -> Result<Self> {
        entries
            .iter()
            .map(Exclusion::compile)
            .collect::<Result<Vec<_>>>()
            .map(Self::new)
    }

    /// True when the rule set lists no exclusions.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when a matching entry lists no metrics.
    pub fn is_job_excluded(&self, job: &str) -> bool {
        self.entries
            .iter()
            .any(|e| e.covers_whole_job() && e.matches_job(job))
    }

    /// True when a matching entry drops the whole job or lists `metric`.
    pub fn is_metric_excluded(&self, job: &str, metric: &str) -> bool {
        self.entries
            .iter()
            .filter(|e| e.matches_job(job))
            .any(|e| e.covers_whole_job() || e.metrics.contains(metric))
    }

    /// Returns the records of `job` that survive exclusion, in input order.
    pub fn filter<'a>(&self, job: &str, records: &'a [MetricRecord]) -> Vec<&'a MetricRecord> {
        records
            .iter()
            .filter(|r| !self.is_metric_excluded(job, &r.metric_name))
            .collect()
    }
}
