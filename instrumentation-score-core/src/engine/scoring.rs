//! Weighted score over rule results.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::models::RuleResult;

/// Computes the instrumentation score in `[0, 100]`.
///
/// A rule with a non-zero cardinality total contributes its series counts,
/// otherwise its metric counts; both are multiplied by the impact weight.
/// When nothing was evaluated the score is 0.
///
/// # Example
/// ```rust
/// use instrumentation_score_core::engine::{RuleResult, score};
/// use instrumentation_score_core::rules::Impact;
///
/// let mut critical = RuleResult::empty("PROM-MET-02", "", Impact::Critical);
/// critical.passed_cardinality = 40_000;
/// critical.total_cardinality = 50_000;
/// let mut important = RuleResult::empty("PROM-LBL-01", "", Impact::Important);
/// important.passed_metrics = 95;
/// important.total_metrics = 100;
///
/// let value = score(&[critical, important]);
/// assert!((value - 80.02).abs() < 0.01);
/// ```
pub fn score(results: &[RuleResult]) -> f64 {
    let mut numerator: u128 = 0;
    let mut denominator: u128 = 0;

    for result in results {
        let weight = u128::from(result.impact.weight());
        let (passed, total) = if result.total_cardinality > 0 {
            (result.passed_cardinality, result.total_cardinality)
        } else {
            (result.passed_metrics, result.total_metrics)
        };
        numerator += u128::from(passed) * weight;
        denominator += u128::from(total) * weight;
    }

    if denominator == 0 {
        return 0.0;
    }
    (numerator as f64 * 100.0 / denominator as f64).clamp(0.0, 100.0)
}

/// Informational band for a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScoreCategory {
    Excellent,
    Good,
    #[serde(rename = "Needs Improvement")]
    NeedsImprovement,
    Poor,
}

impl ScoreCategory {
    pub const ALL: [ScoreCategory; 4] = [
        Self::Excellent,
        Self::Good,
        Self::NeedsImprovement,
        Self::Poor,
    ];

    /// Band containing `score`.
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            Self::Excellent
        } else if score >= 75.0 {
            Self::Good
        } else if score >= 50.0 {
            Self::NeedsImprovement
        } else {
            Self::Poor
        }
    }

    /// Label used in reports.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::NeedsImprovement => "Needs Improvement",
            Self::Poor => "Poor",
        }
    }

    /// Score range shown next to the category in summaries.
    pub fn range(self) -> &'static str {
        match self {
            Self::Excellent => "90-100",
            Self::Good => "75-89",
            Self::NeedsImprovement => "50-74",
            Self::Poor => "0-49",
        }
    }
}

impl fmt::Display for ScoreCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::Impact;

    fn metric_rule(impact: Impact, passed: u64, total: u64) -> RuleResult {
        let mut result = RuleResult::empty("R", "", impact);
        result.passed_metrics = passed;
        result.total_metrics = total;
        result
    }

    #[test]
    fn test_mixed_cardinality_and_metric_scoring() {
        let mut critical = RuleResult::empty("PROM-MET-02", "", Impact::Critical);
        critical.passed_metrics = 80;
        critical.total_metrics = 100;
        critical.passed_cardinality = 40_000;
        critical.total_cardinality = 50_000;
        let important = metric_rule(Impact::Important, 95, 100);

        let expected = 1_602_850.0 / 2_003_000.0 * 100.0;
        let actual = score(&[critical, important]);
        assert!((actual - expected).abs() < 1e-9);
        assert!((actual - 80.02).abs() < 0.01);
    }

    #[test]
    fn test_empty_and_zero_totals_score_zero() {
        assert_eq!(score(&[]), 0.0);
        assert_eq!(score(&[metric_rule(Impact::Low, 0, 0)]), 0.0);
    }

    #[test]
    fn test_all_pass_and_all_fail() {
        assert_eq!(score(&[metric_rule(Impact::Normal, 7, 7)]), 100.0);
        assert_eq!(score(&[metric_rule(Impact::Normal, 0, 7)]), 0.0);
    }

    #[test]
    fn test_weights_change_the_blend() {
        let results = [
            metric_rule(Impact::Critical, 10, 10),
            metric_rule(Impact::Low, 0, 10),
        ];
        assert_eq!(score(&results), 80.0);
    }

    #[test]
    fn test_category_boundaries() {
        assert_eq!(ScoreCategory::from_score(100.0), ScoreCategory::Excellent);
        assert_eq!(ScoreCategory::from_score(90.0), ScoreCategory::Excellent);
        assert_eq!(ScoreCategory::from_score(89.99), ScoreCategory::Good);
        assert_eq!(ScoreCategory::from_score(75.0), ScoreCategory::Good);
        assert_eq!(
            ScoreCategory::from_score(74.99),
            ScoreCategory::NeedsImprovement
        );
        assert_eq!(
            ScoreCategory::from_score(50.0),
            ScoreCategory::NeedsImprovement
        );
        assert_eq!(ScoreCategory::from_score(49.99), ScoreCategory::Poor);
        assert_eq!(ScoreCategory::from_score(0.0), ScoreCategory::Poor);
    }

    #[test]
    fn test_category_serializes_display_name() {
        let json = serde_json::to_string(&ScoreCategory::NeedsImprovement).unwrap();
        assert_eq!(json, "\"Needs Improvement\"");
    }
}
