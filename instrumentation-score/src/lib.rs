//! Library module for instrumentation-score
//!
//! This module exposes the evaluation CLI, the evaluation workflow and the
//! report renderers for testing purposes. The binary entry point is in main.rs.

pub mod evaluate;
pub mod report;

use clap::{ArgGroup, Args, Parser, ValueEnum};
use instrumentation_score_core::{Result, ScoreError};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::report::ReportOptions;

/// CLI argument structure
#[derive(Parser, Debug)]
#[command(name = "instrumentation-score")]
#[command(about = "Scores collected job metrics against an instrumentation rule set")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(group(
    ArgGroup::new("input")
        .required(true)
        .args(["job_file", "job_dir"])
))]
#[command(long_about = "
Instrumentation Score - metrics quality evaluation

Evaluates per-job record files produced by instrumentation-score-collect
against a YAML rule set and reports a weighted 0-100 score per job.

OUTPUT FORMATS (comma-separated, rendered in the order given):
  text        console report
  json        --json-file, or stdout when text is also selected
  html        --html-file (required)
  prometheus  --prometheus-file, or stdout when text is also selected

EXAMPLES:
  instrumentation-score --job-file job_metrics_20240101_120000/api.txt
  instrumentation-score --job-dir job_metrics_20240101_120000 --min-score 75
  instrumentation-score -d job_metrics_20240101_120000 -o text,json,html \\
      --json-file results.json --html-file report.html
  instrumentation-score -d job_metrics_20240101_120000 --show-costs --cost-unit-price 0.002
")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Rule definition file
    #[arg(
        short,
        long,
        default_value = "rules_config.yaml",
        help = "YAML rule definition file"
    )]
    pub rules: PathBuf,

    /// Single job record file
    #[arg(short = 'j', long, help = "Evaluate a single job record file")]
    pub job_file: Option<PathBuf>,

    /// Directory of job record files
    #[arg(short = 'd', long, help = "Evaluate every *.txt job file in a directory")]
    pub job_dir: Option<PathBuf>,

    /// Report formats
    #[arg(
        short,
        long,
        value_enum,
        value_delimiter = ',',
        default_value = "text",
        help = "Output formats, comma-separated"
    )]
    pub output: Vec<OutputFormat>,

    #[arg(long, help = "JSON report file")]
    pub json_file: Option<PathBuf>,

    #[arg(long, help = "HTML report file")]
    pub html_file: Option<PathBuf>,

    #[arg(long, help = "Prometheus exposition file")]
    pub prometheus_file: Option<PathBuf>,

    /// Threshold for the "jobs below threshold" listing
    #[arg(
        long,
        default_value_t = 0.0,
        help = "List jobs scoring below this value (0 disables)"
    )]
    pub min_score: f64,

    #[arg(long, help = "List the metrics that failed each job")]
    pub show_failures: bool,

    #[arg(long, help = "Show series totals and estimated cost")]
    pub show_costs: bool,

    /// Price per series, used with --show-costs
    #[arg(long, default_value_t = 0.0, help = "Cost per active series per month")]
    pub cost_unit_price: f64,
}

#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Increase verbosity
    #[arg(
        short,
        long,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv, -vvv)"
    )]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, help = "Suppress all log output except errors")]
    pub quiet: bool,
}

/// Available report formats
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Console report
    Text,
    /// JSON structured output
    Json,
    /// Self-contained HTML page
    Html,
    /// Prometheus text exposition
    Prometheus,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Text => "text",
            Self::Json => "json",
            Self::Html => "html",
            Self::Prometheus => "prometheus",
        })
    }
}

/// What to evaluate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvaluationInput {
    JobFile(PathBuf),
    JobDir(PathBuf),
}

impl Cli {
    /// Checks format and file combinations before any file is read.
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the missing or conflicting flag.
    pub fn validate(&self) -> Result<()> {
        if self.output.is_empty() {
            return Err(ScoreError::configuration(
                "At least one output format must be specified",
            ));
        }

        let console = self.output.contains(&OutputFormat::Text);
        for format in &self.output {
            match format {
                OutputFormat::Json if self.json_file.is_none() && !console => {
                    return Err(ScoreError::configuration(
                        "--json-file is required when using --output json (or include 'text' for console output)",
                    ));
                }
                OutputFormat::Html if self.html_file.is_none() => {
                    return Err(ScoreError::configuration(
                        "--html-file is required when using --output html",
                    ));
                }
                OutputFormat::Prometheus if self.prometheus_file.is_none() && !console => {
                    return Err(ScoreError::configuration(
                        "--prometheus-file is required when using --output prometheus (or include 'text' for console output)",
                    ));
                }
                _ => {}
            }
        }

        if self.show_costs && !(self.cost_unit_price > 0.0) {
            return Err(ScoreError::configuration(
                "--cost-unit-price must be greater than 0 when --show-costs is enabled",
            ));
        }
        if !self.min_score.is_finite() {
            return Err(ScoreError::configuration("--min-score must be a number"));
        }
        Ok(())
    }

    /// The job file or directory to evaluate.
    pub fn input(&self) -> Result<EvaluationInput> {
        match (&self.job_file, &self.job_dir) {
            (Some(file), None) => Ok(EvaluationInput::JobFile(file.clone())),
            (None, Some(dir)) => Ok(EvaluationInput::JobDir(dir.clone())),
            (Some(_), Some(_)) => Err(ScoreError::configuration(
                "Cannot specify both --job-file and --job-dir",
            )),
            (None, None) => Err(ScoreError::configuration(
                "Must specify either --job-file or --job-dir",
            )),
        }
    }

    /// Requested formats in order, duplicates removed.
    pub fn formats(&self) -> Vec<OutputFormat> {
        let mut formats = Vec::with_capacity(self.output.len());
        for format in &self.output {
            if !formats.contains(format) {
                formats.push(*format);
            }
        }
        formats
    }

    /// Price per series when cost reporting is on.
    pub fn cost_unit_price(&self) -> Option<f64> {
        self.show_costs.then_some(self.cost_unit_price)
    }

    pub fn report_options(&self) -> ReportOptions {
        ReportOptions {
            show_costs: self.show_costs,
            show_failures: self.show_failures,
            min_score: self.min_score,
        }
    }

    /// File destination for `format`, `None` meaning stdout.
    pub fn destination(&self, format: OutputFormat) -> Option<&Path> {
        match format {
            OutputFormat::Text => None,
            OutputFormat::Json => self.json_file.as_deref(),
            OutputFormat::Html => self.html_file.as_deref(),
            OutputFormat::Prometheus => self.prometheus_file.as_deref(),
        }
    }
}
