//! HTML report rendered from `templates/report.html`.
//!
//! Values are formatted here; the template only lays them out.

use askama::Template;
use chrono::{DateTime, Utc};
use instrumentation_score_core::{
    EvaluationReport, JobScore, Result, RuleResult, ScoreCategory, ScoreError,
};

use super::{ReportOptions, status_class};

#[derive(Template)]
#[template(path = "report.html")]
struct HtmlReport {
    title: String,
    generated_at: String,
    summary: Vec<SummaryItem>,
    distribution: Vec<DistributionItem>,
    jobs: Vec<JobView>,
}

struct SummaryItem {
    label: &'static str,
    value: String,
}

struct DistributionItem {
    category: &'static str,
    range: &'static str,
    jobs: usize,
    status_class: &'static str,
}

struct JobView {
    name: String,
    score: String,
    category: &'static str,
    status_class: &'static str,
    total_metrics: usize,
    total_cardinality: u64,
    /// Empty when costs are not shown
    cost: String,
    rules: Vec<RuleView>,
    failed_metrics: Vec<String>,
}

struct RuleView {
    rule_id: String,
    description: String,
    impact: &'static str,
    impact_class: String,
    passed: u64,
    total: u64,
    pass_rate: String,
    status: &'static str,
    status_class: &'static str,
    failed_validators: String,
}

impl RuleView {
    fn new(rule: &RuleResult) -> Self {
        let passed = rule.failed_validators.is_empty();
        Self {
            rule_id: rule.rule_id.clone(),
            description: rule.description.clone(),
            impact: rule.impact.as_str(),
            impact_class: format!("impact-{}", rule.impact.as_str().to_ascii_lowercase()),
            passed: rule.passed_metrics,
            total: rule.total_metrics,
            pass_rate: format!("{:.1}%", rule.pass_rate()),
            status: if passed { "Passed" } else { "Needs attention" },
            status_class: if passed { "status-passed" } else { "status-failed" },
            failed_validators: rule.failed_validators.join(", "),
        }
    }
}

impl JobView {
    fn new(job: &JobScore, options: &ReportOptions) -> Self {
        let cost = match (options.show_costs, job.estimated_cost) {
            (true, Some(cost)) => format!("${:.2}/month", cost),
            _ => String::new(),
        };
        Self {
            name: job.job_name.clone(),
            score: format!("{:.1}", job.score),
            category: job.category.as_str(),
            status_class: status_class(job.score),
            total_metrics: job.total_metrics,
            total_cardinality: job.total_cardinality,
            cost,
            rules: job.rules.iter().map(RuleView::new).collect(),
            failed_metrics: if options.show_failures {
                job.failed_metrics.clone()
            } else {
                Vec::new()
            },
        }
    }
}

fn render(report: HtmlReport) -> Result<String> {
    report
        .render()
        .map_err(|e| ScoreError::report(format!("HTML template: {}", e)))
}

/// Renders the page for one job.
pub fn render_job(
    job: &JobScore,
    options: &ReportOptions,
    generated_at: DateTime<Utc>,
) -> Result<String> {
    render(HtmlReport {
        title: format!("Instrumentation Score: {}", job.job_name),
        generated_at: generated_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        summary: Vec::new(),
        distribution: Vec::new(),
        jobs: vec![JobView::new(job, options)],
    })
}

/// Renders the page for a directory evaluation.
pub fn render_report(report: &EvaluationReport, options: &ReportOptions) -> Result<String> {
    let mut summary = vec![
        SummaryItem {
            label: "Jobs",
            value: report.total_jobs.to_string(),
        },
        SummaryItem {
            label: "Average score",
            value: format!("{:.1}", report.average_score),
        },
        SummaryItem {
            label: "Active series",
            value: report.total_cardinality.to_string(),
        },
    ];
    if report.excluded_jobs > 0 {
        summary.push(SummaryItem {
            label: "Excluded jobs",
            value: report.excluded_jobs.to_string(),
        });
    }
    if options.show_costs {
        summary.push(SummaryItem {
            label: "Total cost",
            value: format!("${:.2}/month", report.total_cost.unwrap_or(0.0)),
        });
    }

    let distribution = ScoreCategory::ALL
        .into_iter()
        .map(|category| DistributionItem {
            category: category.as_str(),
            range: category.range(),
            jobs: report.distribution.count(category),
            status_class: match category {
                ScoreCategory::Excellent => "status-excellent",
                ScoreCategory::Good => "status-good",
                ScoreCategory::NeedsImprovement => "status-warning",
                ScoreCategory::Poor => "status-poor",
            },
        })
        .collect();

    render(HtmlReport {
        title: "Instrumentation Score Report".to_string(),
        generated_at: report.timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        summary,
        distribution,
        jobs: report
            .jobs
            .iter()
            .map(|job| JobView::new(job, options))
            .collect(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use instrumentation_score_core::rules::Impact;
    use instrumentation_score_core::JobOutcome;

    fn job(name: &str, score: f64) -> JobScore {
        let mut rule = RuleResult::empty("PROM-LBL-01", "Label <hygiene>", Impact::Important);
        rule.total_checks = 1;
        rule.passed_metrics = 1;
        rule.total_metrics = 2;
        rule.failed_validators = vec!["label_format".to_string()];
        JobScore {
            job_name: name.to_string(),
            total_metrics: 2,
            total_cardinality: 10,
            estimated_cost: Some(1.5),
            score,
            category: ScoreCategory::from_score(score),
            rules: vec![rule],
            failed_metrics: vec!["Bad_Metric".to_string()],
        }
    }

    #[test]
    fn test_render_job_template() {
        let generated = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let html = render_job(&job("api", 50.0), &ReportOptions::default(), generated).unwrap();

        assert!(html.contains("<title>Instrumentation Score: api</title>"));
        assert!(html.contains("2024-05-01 12:00:00 UTC"));
        assert!(html.contains("status-warning"));
        assert!(html.contains("PROM-LBL-01"));
        assert!(html.contains("impact-important"));
        assert!(html.contains("label_format"));
        assert!(html.contains("Label &#60;hygiene&#62;") || html.contains("Label &lt;hygiene&gt;"));
        assert!(!html.contains("Bad_Metric"));
        assert!(!html.contains("$1.50"));
    }

    #[test]
    fn test_render_report_template() {
        let report = EvaluationReport::from_outcomes(vec![
            JobOutcome::Scored(job("api", 95.0)),
            JobOutcome::Scored(job("worker", 20.0)),
        ]);
        let options = ReportOptions {
            show_costs: true,
            show_failures: true,
            min_score: 0.0,
        };
        let html = render_report(&report, &options).unwrap();

        assert!(html.contains("Average score"));
        assert!(html.contains("57.5"));
        assert!(html.contains("$3.00"));
        assert!(html.contains("Needs Improvement"));
        assert!(html.contains("worker"));
        assert!(html.contains("Bad_Metric"));
    }
}
