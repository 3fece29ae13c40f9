//! Rule evaluation and scoring over realistic rule documents.

#![allow(clippy::unwrap_used)]

use instrumentation_score_core::{
    ExclusionReason, JobOutcome, MetricRecord, RuleEngine, RuleSet, ScoreCategory,
};
use proptest::prelude::*;

fn engine(yaml: &str) -> RuleEngine {
    RuleEngine::new(RuleSet::from_yaml_str(yaml).unwrap())
}

fn record(metric: &str, labels: &[&str], cardinality: u64) -> MetricRecord {
    MetricRecord::new(
        "api",
        metric,
        labels.iter().map(|l| l.to_string()).collect(),
        cardinality,
    )
}

fn single_condition_rule(field: &str, operator: &str, value: &str) -> String {
    format!(
        r#"
rules:
  - rule_id: "R1"
    impact: "Normal"
    validators:
      - name: "v"
        type: "labels"
        data_source: "labels"
        conditions:
          - field: "{}"
            operator: "{}"
            value: {}
"#,
        field, operator, value
    )
}

const WEIGHTED_RULES: &str = r#"
rules:
  - rule_id: "PROM-MET-02"
    description: "No legacy high-cardinality metrics"
    impact: "Critical"
    validators:
      - name: "no_legacy_metrics"
        type: "cardinality"
        data_source: "cardinality"
        conditions:
          - field: "metric_name"
            operator: "not_contains"
            value: "legacy"
  - rule_id: "PROM-LBL-01"
    description: "No user identifiers in labels"
    impact: "Important"
    validators:
      - name: "no_user_labels"
        type: "labels"
        data_source: "labels"
        conditions:
          - field: "labels"
            operator: "not_contains"
            value: "user_id"
"#;

#[test]
fn test_weighted_score_scenario() {
    let mut records = Vec::new();
    for i in 0..80 {
        let labels: &[&str] = if i < 5 { &["user_id"] } else { &["method"] };
        records.push(record(&format!("ok_metric_{}", i), labels, 500));
    }
    for i in 0..20 {
        records.push(record(&format!("legacy_metric_{}", i), &["method"], 500));
    }

    let results = engine(WEIGHTED_RULES).evaluate(&records);
    assert_eq!(results.len(), 2);

    let cardinality_rule = &results[0];
    assert_eq!(cardinality_rule.passed_cardinality, 40_000);
    assert_eq!(cardinality_rule.total_cardinality, 50_000);
    assert_eq!(cardinality_rule.passed_metrics, 80);

    let label_rule = &results[1];
    assert_eq!(label_rule.passed_metrics, 95);
    assert_eq!(label_rule.total_metrics, 100);
    assert_eq!(label_rule.total_cardinality, 0);
    assert_eq!(label_rule.passed_cardinality, 0);

    let value = instrumentation_score_core::score(&results);
    let expected = 1_602_850.0 * 100.0 / 2_003_000.0;
    assert!((value - expected).abs() < 1e-9);
    assert!((value - 80.02).abs() < 0.01);
    assert_eq!(ScoreCategory::from_score(value), ScoreCategory::Good);
}

#[test]
fn test_label_set_asymmetry() {
    let all_lowercase = engine(&single_condition_rule("labels", "matches", r#""^[a-z]+$""#));
    let contains_meth = engine(&single_condition_rule("labels", "contains", r#""meth""#));

    let clean = [record("http_requests_total", &["method", "status"], 1)];
    let mixed = [record("http_requests_total", &["method", "USER"], 1)];

    assert_eq!(all_lowercase.evaluate(&clean)[0].passed_metrics, 1);
    assert_eq!(all_lowercase.evaluate(&mixed)[0].passed_metrics, 0);
    assert_eq!(contains_meth.evaluate(&mixed)[0].passed_metrics, 1);
}

#[test]
fn test_failing_metric_counts_once_per_validator() {
    let yaml = r#"
rules:
  - rule_id: "PROM-LBL-02"
    impact: "Low"
    validators:
      - name: "few_labels"
        type: "label_count"
        data_source: "labels"
        conditions:
          - field: "label_count"
            operator: "lte"
            value: 1
      - name: "no_user_labels"
        type: "labels"
        data_source: "labels"
        conditions:
          - field: "labels"
            operator: "not_contains"
            value: "user_id"
"#;
    let records = [
        record("sessions", &["user_id", "region"], 3),
        record("up", &["instance"], 1),
    ];

    let result = &engine(yaml).evaluate(&records)[0];
    assert_eq!(result.total_metrics, 4);
    assert_eq!(result.passed_metrics, 2);
    assert_eq!(result.total_checks, 2);
    assert_eq!(result.passed_checks, 0);
    assert_eq!(
        result.failed_metrics["sessions"],
        vec!["few_labels".to_string(), "no_user_labels".to_string()]
    );
}

#[test]
fn test_exclusions_remove_jobs_and_metrics() {
    let yaml = r#"
exclusion_list:
  - job_name_pattern: "^test-"
  - job: "api"
    metrics: ["go_gc_duration_seconds"]
rules:
  - rule_id: "R1"
    impact: "Normal"
    validators:
      - name: "bounded"
        type: "cardinality"
        data_source: "cardinality"
        conditions:
          - field: "count"
            operator: "lt"
            value: 100
"#;
    let engine = engine(yaml);

    let outcome = engine.evaluate_job("test-canary", &[record("up", &[], 1)], None);
    assert_eq!(
        outcome,
        JobOutcome::Excluded {
            job: "test-canary".to_string(),
            reason: ExclusionReason::JobExcluded,
        }
    );

    let only_excluded = [record("go_gc_duration_seconds", &["quantile"], 500)];
    let outcome = engine.evaluate_job("api", &only_excluded, None);
    assert!(matches!(
        outcome,
        JobOutcome::Excluded {
            reason: ExclusionReason::NoMetricsRemaining,
            ..
        }
    ));

    let records = [
        record("go_gc_duration_seconds", &["quantile"], 500),
        record("up", &["instance"], 1),
    ];
    let JobOutcome::Scored(job) = engine.evaluate_job("api", &records, None) else {
        panic!("api should be scored");
    };
    assert_eq!(job.total_metrics, 1);
    assert_eq!(job.total_cardinality, 1);
    assert!((job.score - 100.0).abs() < 1e-9);
}

#[test]
fn test_evaluation_is_idempotent() {
    let engine = engine(WEIGHTED_RULES);
    let records = [
        record("legacy_requests", &["user_id"], 10),
        record("http_requests_total", &["method"], 20),
    ];

    let first = engine.evaluate(&records);
    let second = engine.evaluate(&records);
    assert_eq!(first, second);
    assert_eq!(
        engine.evaluate_job("api", &records, Some(0.1)),
        engine.evaluate_job("api", &records, Some(0.1))
    );
}

#[test]
fn test_trivial_rule_sets_score_extremes() {
    let records = [record("up", &["instance"], 1), record("req", &[], 7)];

    let always = engine(&single_condition_rule("label_count", "gte", "0"));
    assert!((instrumentation_score_core::score(&always.evaluate(&records)) - 100.0).abs() < 1e-9);

    let never = engine(&single_condition_rule("label_count", "lt", "0"));
    assert!(instrumentation_score_core::score(&never.evaluate(&records)).abs() < 1e-9);
}

fn arb_record() -> impl Strategy<Value = MetricRecord> {
    (
        "[a-z_]{1,12}",
        prop::collection::vec("[a-zA-Z_]{1,8}", 0..6),
        0u64..100_000,
    )
        .prop_map(|(metric, labels, cardinality)| {
            MetricRecord::new("api", metric, labels, cardinality)
        })
}

proptest! {
    #[test]
    fn prop_counts_and_score_stay_in_bounds(records in prop::collection::vec(arb_record(), 0..40)) {
        let engine = engine(WEIGHTED_RULES);
        let results = engine.evaluate(&records);

        for result in &results {
            prop_assert!(result.passed_metrics <= result.total_metrics);
            prop_assert!(result.passed_cardinality <= result.total_cardinality);
            prop_assert!(result.passed_checks <= result.total_checks);
        }
        let value = instrumentation_score_core::score(&results);
        prop_assert!((0.0..=100.0).contains(&value));
    }
}
