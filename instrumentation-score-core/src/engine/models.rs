//! Evaluation results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::scoring::ScoreCategory;
use crate::rules::Impact;

/// Pass counts of one validator within a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorStat {
    pub name: String,
    pub passed_metrics: u64,
    pub total_metrics: u64,
    /// Percentage of metrics that passed, 0 when nothing was evaluated
    pub pass_rate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui_description: Option<String>,
}

/// Outcome of one rule for one job.
///
/// `total_metrics` counts validator and metric pairs, so a metric checked by
/// two validators of the rule is counted twice. Cardinality sums only include
/// validators reading the cardinality view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleResult {
    pub rule_id: String,
    pub description: String,
    pub impact: Impact,
    pub passed_metrics: u64,
    pub total_metrics: u64,
    pub passed_cardinality: u64,
    pub total_cardinality: u64,
    /// Number of validators in the rule
    pub total_checks: usize,
    /// Validators that no metric failed
    pub passed_checks: usize,
    pub failed_validators: Vec<String>,
    /// Metric name to the validators that rejected it
    pub failed_metrics: BTreeMap<String, Vec<String>>,
    pub validators: Vec<ValidatorStat>,
}

impl RuleResult {
    /// A result with all counters at zero.
    pub fn empty(
        rule_id: impl Into<String>,
        description: impl Into<String>,
        impact: Impact,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            description: description.into(),
            impact,
            passed_metrics: 0,
            total_metrics: 0,
            passed_cardinality: 0,
            total_cardinality: 0,
            total_checks: 0,
            passed_checks: 0,
            failed_validators: Vec::new(),
            failed_metrics: BTreeMap::new(),
            validators: Vec::new(),
        }
    }

    /// Percentage of metric checks that passed.
    pub fn pass_rate(&self) -> f64 {
        percentage(self.passed_metrics, self.total_metrics)
    }

    /// Number of validators with at least one failing metric.
    pub fn failed_checks(&self) -> usize {
        self.total_checks - self.passed_checks
    }
}

pub(crate) fn percentage(passed: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        passed as f64 * 100.0 / total as f64
    }
}

/// Score of one evaluated job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobScore {
    pub job_name: String,
    /// Records evaluated after exclusion
    pub total_metrics: usize,
    pub total_cardinality: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_cost: Option<f64>,
    pub score: f64,
    pub category: ScoreCategory,
    #[serde(rename = "rule_results")]
    pub rules: Vec<RuleResult>,
    /// Distinct metrics that failed any rule, in first-seen order
    pub failed_metrics: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    /// The exclusion list removes the whole job
    JobExcluded,
    /// Metric exclusions left nothing to evaluate
    NoMetricsRemaining,
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::JobExcluded => f.write_str("job is excluded from evaluation"),
            Self::NoMetricsRemaining => {
                f.write_str("no metrics remaining after exclusion filtering")
            }
        }
    }
}

/// Terminal state of a job. Excluded jobs carry no score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobOutcome {
    Scored(JobScore),
    Excluded { job: String, reason: ExclusionReason },
}

impl JobOutcome {
    /// Name of the job the outcome belongs to.
    pub fn job(&self) -> &str {
        match self {
            Self::Scored(score) => &score.job_name,
            Self::Excluded { job, .. } => job,
        }
    }

    /// The score, unless the job was excluded.
    pub fn as_scored(&self) -> Option<&JobScore> {
        match self {
            Self::Scored(score) => Some(score),
            Self::Excluded { .. } => None,
        }
    }
}

/// Number of jobs per score category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDistribution {
    pub excellent: usize,
    pub good: usize,
    pub needs_improvement: usize,
    pub poor: usize,
}

impl CategoryDistribution {
    /// Jobs that fell in `category`.
    pub fn count(&self, category: ScoreCategory) -> usize {
        match category {
            ScoreCategory::Excellent => self.excellent,
            ScoreCategory::Good => self.good,
            ScoreCategory::NeedsImprovement => self.needs_improvement,
            ScoreCategory::Poor => self.poor,
        }
    }

    fn add(&mut self, category: ScoreCategory) {
        match category {
            ScoreCategory::Excellent => self.excellent += 1,
            ScoreCategory::Good => self.good += 1,
            ScoreCategory::NeedsImprovement => self.needs_improvement += 1,
            ScoreCategory::Poor => self.poor += 1,
        }
    }
}

/// Summary of a multi-job evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub timestamp: DateTime<Utc>,
    /// Jobs that received a score
    pub total_jobs: usize,
    pub average_score: f64,
    pub total_cardinality: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_cost: Option<f64>,
    pub excluded_jobs: usize,
    pub distribution: CategoryDistribution,
    pub jobs: Vec<JobScore>,
}

impl EvaluationReport {
    /// Builds the summary from per-job outcomes, keeping scored jobs in order.
    pub fn from_outcomes(outcomes: impl IntoIterator<Item = JobOutcome>) -> Self {
        let mut jobs = Vec::new();
        let mut excluded_jobs = 0;
        for outcome in outcomes {
            match outcome {
                JobOutcome::Scored(job) => jobs.push(job),
                JobOutcome::Excluded { .. } => excluded_jobs += 1,
            }
        }

        let mut distribution = CategoryDistribution::default();
        for job in &jobs {
            distribution.add(job.category);
        }

        let average_score = if jobs.is_empty() {
            0.0
        } else {
            jobs.iter().map(|j| j.score).sum::<f64>() / jobs.len() as f64
        };
        let total_cost = jobs
            .iter()
            .filter_map(|j| j.estimated_cost)
            .fold(None, |acc: Option<f64>, cost| Some(acc.unwrap_or(0.0) + cost));

        Self {
            timestamp: Utc::now(),
            total_jobs: jobs.len(),
            average_score,
            total_cardinality: jobs.iter().map(|j| j.total_cardinality).sum(),
            total_cost,
            excluded_jobs,
            distribution,
            jobs,
        }
    }

    /// Jobs scoring strictly below `min_score`.
    pub fn jobs_below(&self, min_score: f64) -> Vec<&JobScore> {
        self.jobs.iter().filter(|j| j.score < min_score).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(name: &str, score: f64, cardinality: u64, cost: Option<f64>) -> JobOutcome {
        JobOutcome::Scored(JobScore {
            job_name: name.to_string(),
            total_metrics: 1,
            total_cardinality: cardinality,
            estimated_cost: cost,
            score,
            category: ScoreCategory::from_score(score),
            rules: Vec::new(),
            failed_metrics: Vec::new(),
        })
    }

    #[test]
    fn test_report_aggregates_scored_jobs() {
        let report = EvaluationReport::from_outcomes(vec![
            job("api", 95.0, 100, Some(1.0)),
            job("worker", 60.0, 50, Some(0.5)),
            JobOutcome::Excluded {
                job: "node".to_string(),
                reason: ExclusionReason::JobExcluded,
            },
            job("batch", 40.0, 10, None),
        ]);

        assert_eq!(report.total_jobs, 3);
        assert_eq!(report.excluded_jobs, 1);
        assert!((report.average_score - 65.0).abs() < 1e-9);
        assert_eq!(report.total_cardinality, 160);
        assert_eq!(report.total_cost, Some(1.5));
        assert_eq!(report.distribution.count(ScoreCategory::Excellent), 1);
        assert_eq!(report.distribution.count(ScoreCategory::NeedsImprovement), 1);
        assert_eq!(report.distribution.count(ScoreCategory::Poor), 1);
        assert_eq!(report.distribution.count(ScoreCategory::Good), 0);

        let below: Vec<_> = report
            .jobs_below(60.0)
            .iter()
            .map(|j| j.job_name.as_str())
            .collect();
        assert_eq!(below, vec!["batch"]);
    }

    #[test]
    fn test_report_without_scored_jobs() {
        let report = EvaluationReport::from_outcomes(Vec::new());
        assert_eq!(report.total_jobs, 0);
        assert_eq!(report.average_score, 0.0);
        assert_eq!(report.total_cost, None);
    }

    #[test]
    fn test_rule_result_pass_rate() {
        let mut result = RuleResult::empty("R", "", Impact::Low);
        assert_eq!(result.pass_rate(), 0.0);
        result.passed_metrics = 1;
        result.total_metrics = 4;
        assert_eq!(result.pass_rate(), 25.0);
    }

    #[test]
    fn test_job_outcome_serialization_is_tagged() {
        let outcome = JobOutcome::Excluded {
            job: "node".to_string(),
            reason: ExclusionReason::NoMetricsRemaining,
        };
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["status"], "excluded");
        assert_eq!(value["reason"], "no_metrics_remaining");
    }
}
