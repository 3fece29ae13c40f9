//! JSON report.

use instrumentation_score_core::{EvaluationReport, JobScore, Result, ScoreError};

pub fn render_job(job: &JobScore) -> Result<String> {
    serde_json::to_string_pretty(job)
        .map(|body| body + "\n")
        .map_err(|e| ScoreError::serialization(format!("job {}", job.job_name), e))
}

pub fn render_report(report: &EvaluationReport) -> Result<String> {
    serde_json::to_string_pretty(report)
        .map(|body| body + "\n")
        .map_err(|e| ScoreError::serialization("evaluation report", e))
}
