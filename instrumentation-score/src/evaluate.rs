//! Evaluation workflow.
//!
//! Loads the rule set, scores one job file or every job file in a directory
//! and renders the requested reports.

use chrono::Utc;
use instrumentation_score_core::records::{list_job_files, read_job_file};
use instrumentation_score_core::{
    EvaluationReport, JobOutcome, JobScore, Result, RuleEngine, RuleSet, ScoreError,
};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::report::{self, ReportOptions, write_report};
use crate::{Cli, EvaluationInput, OutputFormat};

/// Job file in a directory that produced no outcome.
#[derive(Debug)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Result of evaluating a directory of job files.
#[derive(Debug)]
pub struct DirectoryEvaluation {
    pub report: EvaluationReport,
    pub skipped: Vec<SkippedFile>,
}

/// Scores a single job file.
///
/// The job name is taken from the first record.
///
/// # Errors
///
/// Fails when the file cannot be read or holds no valid records.
pub async fn evaluate_job_file(
    engine: &RuleEngine,
    path: &Path,
    cost_unit_price: Option<f64>,
) -> Result<JobOutcome> {
    let records = read_job_file(path).await?;
    let Some(first) = records.first() else {
        return Err(ScoreError::evaluation(format!(
            "No metrics found in {}",
            path.display()
        )));
    };
    let job = first.job.clone();
    debug!("Evaluating {} records of job {}", records.len(), job);

    Ok(engine.evaluate_job(&job, &records, cost_unit_price))
}

/// Scores every job file in `dir`.
///
/// Unreadable and empty files are skipped with a warning; excluded jobs are
/// counted in the report but carry no score.
///
/// # Errors
///
/// Fails when the directory holds no job files or none of them was scored.
pub async fn evaluate_job_dir(
    engine: &RuleEngine,
    dir: &Path,
    cost_unit_price: Option<f64>,
) -> Result<DirectoryEvaluation> {
    let files = list_job_files(dir).await?;
    if files.is_empty() {
        return Err(ScoreError::evaluation(format!(
            "No job metric files found in {}",
            dir.display()
        )));
    }
    info!("Found {} job files to evaluate", files.len());

    let total = files.len();
    let mut outcomes = Vec::with_capacity(total);
    let mut skipped = Vec::new();
    for (index, path) in files.into_iter().enumerate() {
        debug!("Evaluating job file {}/{}: {}", index + 1, total, path.display());
        match evaluate_job_file(engine, &path, cost_unit_price).await {
            Ok(outcome) => {
                if let JobOutcome::Excluded { job, reason } = &outcome {
                    debug!("Job {} excluded: {}", job, reason);
                }
                outcomes.push(outcome);
            }
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                skipped.push(SkippedFile {
                    path,
                    reason: e.to_string(),
                });
            }
        }
    }

    let report = EvaluationReport::from_outcomes(outcomes);
    if report.excluded_jobs > 0 {
        info!(
            "Excluded {} job(s) based on the rule set exclusion list",
            report.excluded_jobs
        );
    }
    if report.jobs.is_empty() {
        return Err(ScoreError::evaluation("No jobs were successfully evaluated"));
    }

    Ok(DirectoryEvaluation { report, skipped })
}

/// Runs the evaluation described by the command line.
pub async fn run_evaluation(cli: &Cli) -> Result<()> {
    cli.validate()?;
    let input = cli.input()?;

    let rule_set = RuleSet::load(&cli.rules).await?;
    let engine = RuleEngine::new(rule_set);
    let options = cli.report_options();

    match input {
        EvaluationInput::JobFile(path) => {
            match evaluate_job_file(&engine, &path, cli.cost_unit_price()).await? {
                JobOutcome::Scored(job) => {
                    info!("Job {} scored {:.2}", job.job_name, job.score);
                    write_job_reports(cli, &job, &options).await
                }
                JobOutcome::Excluded { job, reason } => {
                    println!("Job {} was not scored: {}", job, reason);
                    Ok(())
                }
            }
        }
        EvaluationInput::JobDir(dir) => {
            let evaluation = evaluate_job_dir(&engine, &dir, cli.cost_unit_price()).await?;
            info!(
                "Scored {} jobs, average {:.2}",
                evaluation.report.total_jobs, evaluation.report.average_score
            );
            if !evaluation.skipped.is_empty() {
                warn!("{} job files could not be evaluated", evaluation.skipped.len());
            }
            write_directory_reports(cli, &evaluation.report, &options).await
        }
    }
}

async fn write_job_reports(cli: &Cli, job: &JobScore, options: &ReportOptions) -> Result<()> {
    for format in cli.formats() {
        let destination = cli.destination(format);
        match format {
            OutputFormat::Text => print!("{}", report::text::render_job(job, options)),
            OutputFormat::Json => {
                let body = report::json::render_job(job)?;
                write_report(destination, &body, "JSON report").await?;
            }
            OutputFormat::Html => {
                let body = report::html::render_job(job, options, Utc::now())?;
                write_report(destination, &body, "HTML report").await?;
            }
            OutputFormat::Prometheus => {
                let body = report::prometheus::render_job(job);
                write_report(destination, &body, "Prometheus metrics").await?;
            }
        }
    }
    Ok(())
}

async fn write_directory_reports(
    cli: &Cli,
    evaluation: &EvaluationReport,
    options: &ReportOptions,
) -> Result<()> {
    for format in cli.formats() {
        let destination = cli.destination(format);
        match format {
            OutputFormat::Text => print!("{}", report::text::render_summary(evaluation, options)),
            OutputFormat::Json => {
                let body = report::json::render_report(evaluation)?;
                write_report(destination, &body, "JSON report").await?;
            }
            OutputFormat::Html => {
                let body = report::html::render_report(evaluation, options)?;
                write_report(destination, &body, "HTML report").await?;
            }
            OutputFormat::Prometheus => {
                let body = report::prometheus::render_report(evaluation);
                write_report(destination, &body, "Prometheus metrics").await?;
            }
        }
    }
    Ok(())
}
