//! Prometheus text exposition of scores.
//!
//! Single-job output labels series with `service_name`; directory output
//! labels them with `job` so they can back per-job SLOs.

use instrumentation_score_core::{EvaluationReport, JobScore, RuleResult};

/// Escapes a label value for the text exposition format.
pub fn escape_label_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn header(out: &mut String, name: &str, help: &str, kind: &str) {
    out.push_str(&format!("# HELP {} {}\n", name, help));
    out.push_str(&format!("# TYPE {} {}\n", name, kind));
}

fn rule_counters(out: &mut String, label: &str, jobs: &[(&str, &[RuleResult])]) {
    header(
        out,
        "instrumentation_rule_checks_total",
        "Total number of rule checks",
        "counter",
    );
    for (job, rules) in jobs {
        for rule in *rules {
            out.push_str(&format!(
                "instrumentation_rule_checks_total{{{}=\"{}\",rule_id=\"{}\",impact=\"{}\"}} {}\n",
                label,
                escape_label_value(job),
                escape_label_value(&rule.rule_id),
                rule.impact,
                rule.total_checks
            ));
        }
    }

    out.push('\n');
    header(
        out,
        "instrumentation_rule_failures_total",
        "Total number of rule failures",
        "counter",
    );
    for (job, rules) in jobs {
        for rule in *rules {
            out.push_str(&format!(
                "instrumentation_rule_failures_total{{{}=\"{}\",rule_id=\"{}\",impact=\"{}\"}} {}\n",
                label,
                escape_label_value(job),
                escape_label_value(&rule.rule_id),
                rule.impact,
                rule.failed_checks()
            ));
        }
    }
}

/// Score and rule counters for one job.
pub fn render_job(job: &JobScore) -> String {
    let mut out = String::new();
    header(
        &mut out,
        "instrumentation_score",
        "Overall instrumentation quality score (0-100)",
        "gauge",
    );
    out.push_str(&format!(
        "instrumentation_score{{service_name=\"{}\"}} {:.1}\n\n",
        escape_label_value(&job.job_name),
        job.score
    ));
    rule_counters(
        &mut out,
        "service_name",
        &[(job.job_name.as_str(), job.rules.as_slice())],
    );
    out
}

/// Per-job quality gauges and rule counters for a directory evaluation.
pub fn render_report(report: &EvaluationReport) -> String {
    let mut out = String::new();
    header(
        &mut out,
        "instrumentation_quality_score",
        "Instrumentation quality score per job (0-100)",
        "gauge",
    );
    for job in &report.jobs {
        out.push_str(&format!(
            "instrumentation_quality_score{{job=\"{}\"}} {:.2}\n",
            escape_label_value(&job.job_name),
            job.score
        ));
    }
    out.push('\n');

    let jobs: Vec<(&str, &[RuleResult])> = report
        .jobs
        .iter()
        .map(|job| (job.job_name.as_str(), job.rules.as_slice()))
        .collect();
    rule_counters(&mut out, "job", &jobs);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use instrumentation_score_core::engine::ScoreCategory;
    use instrumentation_score_core::rules::Impact;
    use instrumentation_score_core::JobOutcome;

    fn job(name: &str, score: f64) -> JobScore {
        let mut rule = RuleResult::empty("PROM-MET-02", "", Impact::Critical);
        rule.total_checks = 3;
        rule.passed_checks = 1;
        JobScore {
            job_name: name.to_string(),
            total_metrics: 1,
            total_cardinality: 1,
            estimated_cost: None,
            score,
            category: ScoreCategory::from_score(score),
            rules: vec![rule],
            failed_metrics: Vec::new(),
        }
    }

    #[test]
    fn test_escape_label_value() {
        assert_eq!(escape_label_value(r#"a"b\c"#), r#"a\"b\\c"#);
        assert_eq!(escape_label_value("x\ny"), "x\\ny");
    }

    #[test]
    fn test_render_job_exposition() {
        let out = render_job(&job("api", 80.02));
        assert!(out.starts_with("# HELP instrumentation_score "));
        assert!(out.contains("# TYPE instrumentation_score gauge\n"));
        assert!(out.contains("instrumentation_score{service_name=\"api\"} 80.0\n"));
        assert!(out.contains(
            "instrumentation_rule_checks_total{service_name=\"api\",rule_id=\"PROM-MET-02\",impact=\"Critical\"} 3\n"
        ));
        assert!(out.contains(
            "instrumentation_rule_failures_total{service_name=\"api\",rule_id=\"PROM-MET-02\",impact=\"Critical\"} 2\n"
        ));
    }

    #[test]
    fn test_render_report_exposition() {
        let report = EvaluationReport::from_outcomes(vec![
            JobOutcome::Scored(job("api", 91.256)),
            JobOutcome::Scored(job("worker", 40.0)),
        ]);
        let out = render_report(&report);
        assert!(out.contains("# TYPE instrumentation_quality_score gauge\n"));
        assert!(out.contains("instrumentation_quality_score{job=\"api\"} 91.26\n"));
        assert!(out.contains("instrumentation_quality_score{job=\"worker\"} 40.00\n"));
        assert!(out.contains(
            "instrumentation_rule_failures_total{job=\"worker\",rule_id=\"PROM-MET-02\",impact=\"Critical\"} 2\n"
        ));
    }
}
