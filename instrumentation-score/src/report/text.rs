//! Console report.

use instrumentation_score_core::engine::ScoreCategory;
use instrumentation_score_core::{EvaluationReport, JobScore};

use super::ReportOptions;

/// Renders the report for one job.
pub fn render_job(job: &JobScore, options: &ReportOptions) -> String {
    let mut out = format!(
        "\n=== Instrumentation Score Report for Job: {} ===\n\n",
        job.job_name
    );
    out.push_str(&format!("Total Metrics: {}\n", job.total_metrics));
    if options.show_costs {
        out.push_str(&format!("Total Cardinality: {} series\n", job.total_cardinality));
        if let Some(cost) = job.estimated_cost {
            out.push_str(&format!("Estimated Cost: ${:.2}/month\n", cost));
        }
    }
    out.push_str(&format!(
        "Instrumentation Score: {:.2}% ({})\n\n",
        job.score, job.category
    ));

    out.push_str("Rule Evaluation Results:\n");
    out.push_str("------------------------\n");
    for rule in &job.rules {
        out.push_str(&format!(
            "Rule {} ({}): {}/{} metrics passed ({:.1}%)\n",
            rule.rule_id,
            rule.impact,
            rule.passed_metrics,
            rule.total_metrics,
            rule.pass_rate()
        ));
        if !rule.failed_validators.is_empty() {
            out.push_str(&format!(
                "  Failed validators: {}\n",
                rule.failed_validators.join(", ")
            ));
        }
    }

    if options.show_failures {
        out.push_str(&failures(job));
    }
    out
}

/// Failed metrics with the rule and validator that rejected each one.
fn failures(job: &JobScore) -> String {
    if job.failed_metrics.is_empty() {
        return String::new();
    }

    let mut out = String::from("\nFailed Metrics:\n");
    for metric in &job.failed_metrics {
        let checks: Vec<String> = job
            .rules
            .iter()
            .filter_map(|rule| {
                rule.failed_metrics
                    .get(metric)
                    .map(|validators| format!("{} [{}]", rule.rule_id, validators.join(", ")))
            })
            .collect();
        out.push_str(&format!("  - {}: {}\n", metric, checks.join("; ")));
    }
    out
}

/// Renders the multi-job summary.
pub fn render_summary(report: &EvaluationReport, options: &ReportOptions) -> String {
    let mut out = String::from("\n=== Jobs ===\n");
    for job in &report.jobs {
        out.push_str(&format!(
            "  {:<40} {:>6.2}%  {}\n",
            job.job_name, job.score, job.category
        ));
    }

    if options.show_failures {
        for job in report.jobs.iter().filter(|j| !j.failed_metrics.is_empty()) {
            out.push_str(&format!("\n[{}]", job.job_name));
            out.push_str(&failures(job));
        }
    }

    out.push_str("\n=== Summary ===\n");
    out.push_str(&format!("Total Jobs: {}\n", report.total_jobs));
    if report.excluded_jobs > 0 {
        out.push_str(&format!("Excluded Jobs: {}\n", report.excluded_jobs));
    }
    out.push_str(&format!("Average Score: {:.2}%\n", report.average_score));
    out.push_str(&format!(
        "Total Active Series: {}\n",
        report.total_cardinality
    ));
    if options.show_costs {
        out.push_str(&format!(
            "Total Cost: ${:.2}/month\n",
            report.total_cost.unwrap_or(0.0)
        ));
    }

    out.push_str("\nScore Distribution:\n");
    for category in ScoreCategory::ALL {
        out.push_str(&format!(
            "  {} ({}): {} jobs\n",
            category,
            category.range(),
            report.distribution.count(category)
        ));
    }

    if options.min_score > 0.0 {
        out.push_str(&format!(
            "\nJobs Below Threshold ({:.2}%):\n",
            options.min_score
        ));
        let below = report.jobs_below(options.min_score);
        if below.is_empty() {
            out.push_str("  (none)\n");
        }
        for job in below {
            out.push_str(&format!("  - {}: {:.2}%\n", job.job_name, job.score));
        }
    }
    out
}
