//! Rule evaluation over a job's records.

use std::collections::HashSet;
use tracing::debug;

use super::models::{ExclusionReason, JobOutcome, JobScore, RuleResult, ValidatorStat, percentage};
use super::scoring::{ScoreCategory, score};
use crate::models::MetricRecord;
use crate::rules::{Rule, RuleSet};

/// Evaluates records against a compiled [`RuleSet`].
///
/// The engine holds no mutable state: evaluating the same records twice
/// yields identical results, and separate jobs can be evaluated from
/// separate threads.
#[derive(Debug, Clone)]
pub struct RuleEngine {
    rule_set: RuleSet,
}

impl RuleEngine {
    /// Creates an engine over a loaded rule set.
    pub fn new(rule_set: RuleSet) -> Self {
        Self { rule_set }
    }

    /// The rules and exclusions this engine applies.
    pub fn rule_set(&self) -> &RuleSet {
        &self.rule_set
    }

    /// One result per rule, in rule order. Exclusions are not applied.
    pub fn evaluate(&self, records: &[MetricRecord]) -> Vec<RuleResult> {
        let records: Vec<&MetricRecord> = records.iter().collect();
        self.evaluate_refs(&records)
    }

    fn evaluate_refs(&self, records: &[&MetricRecord]) -> Vec<RuleResult> {
        self.rule_set
            .rules()
            .iter()
            .map(|rule| evaluate_rule(rule, records))
            .collect()
    }

    /// Applies exclusions, evaluates the remaining records and scores the job.
    ///
    /// With `cost_unit_price` set, the job's evaluated cardinality is priced.
    pub fn evaluate_job(
        &self,
        job: &str,
        records: &[MetricRecord],
        cost_unit_price: Option<f64>,
    ) -> JobOutcome {
        let exclusions = self.rule_set.exclusions();
        if exclusions.is_job_excluded(job) {
            debug!("Job {} is excluded from evaluation", job);
            return JobOutcome::Excluded {
                job: job.to_string(),
                reason: ExclusionReason::JobExcluded,
            };
        }

        let remaining = exclusions.filter(job, records);
        if remaining.is_empty() {
            debug!("No metrics remaining for job {} after exclusions", job);
            return JobOutcome::Excluded {
                job: job.to_string(),
                reason: ExclusionReason::NoMetricsRemaining,
            };
        }
        if remaining.len() < records.len() {
            debug!(
                "Excluded {} of {} metrics for job {}",
                records.len() - remaining.len(),
                records.len(),
                job
            );
        }

        let rules = self.evaluate_refs(&remaining);
        let value = score(&rules);
        let total_cardinality: u64 = remaining.iter().map(|r| r.cardinality).sum();

        JobOutcome::Scored(JobScore {
            job_name: job.to_string(),
            total_metrics: remaining.len(),
            total_cardinality,
            estimated_cost: cost_unit_price.map(|price| total_cardinality as f64 * price),
            score: value,
            category: ScoreCategory::from_score(value),
            failed_metrics: distinct_failed_metrics(&rules),
            rules,
        })
    }
}

fn evaluate_rule(rule: &Rule, records: &[&MetricRecord]) -> RuleResult {
    let mut result = RuleResult::empty(&rule.rule_id, &rule.description, rule.impact);
    result.total_checks = rule.validators.len();

    for validator in &rule.validators {
        let weighs_cardinality = validator.weighs_cardinality();
        let mut passed: u64 = 0;

        for record in records {
            let ok = validator.passes(record);
            if weighs_cardinality {
                result.total_cardinality += record.cardinality;
                if ok {
                    result.passed_cardinality += record.cardinality;
                }
            }
            if ok {
                passed += 1;
            } else {
                result
                    .failed_metrics
                    .entry(record.metric_name.clone())
                    .or_default()
                    .push(validator.name.clone());
            }
        }

        let total = records.len() as u64;
        result.passed_metrics += passed;
        result.total_metrics += total;
        if passed == total {
            result.passed_checks += 1;
        } else {
            result.failed_validators.push(validator.name.clone());
        }

        result.validators.push(ValidatorStat {
            name: validator.name.clone(),
            passed_metrics: passed,
            total_metrics: total,
            pass_rate: percentage(passed, total),
            ui_title: validator.ui_title.clone(),
            ui_description: validator.ui_description.clone(),
        });
    }

    result
}

fn distinct_failed_metrics(results: &[RuleResult]) -> Vec<String> {
    let mut seen = HashSet::new();
    results
        .iter()
        .flat_map(|r| r.failed_metrics.keys())
        .filter(|metric| seen.insert(metric.as_str()))
        .cloned()
        .collect()
}
