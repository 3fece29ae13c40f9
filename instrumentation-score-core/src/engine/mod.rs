//! Rule evaluation and scoring.

mod evaluator;
mod models;
mod scoring;

pub use evaluator::RuleEngine;
pub use models::{
    CategoryDistribution, EvaluationReport, ExclusionReason, JobOutcome, JobScore, RuleResult,
    ValidatorStat,
};
pub use scoring::{ScoreCategory, score};
