//! Checked, typed rules ready for evaluation.
//!
//! Every string tag of the document (impact, validator type, data source,
//! field and operator) is resolved here once; evaluation never sees an
//! unknown tag or an operand of the wrong type.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::models::MetricRecord;

/// How much a rule contributes to the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Impact {
    /// Weight 40
    Critical,
    /// Weight 30
    Important,
    /// Weight 20
    Normal,
    /// Weight 10
    Low,
}

impl Impact {
    /// Fixed score weight of this impact level.
    pub fn weight(self) -> u64 {
        match self {
            Self::Critical => 40,
            Self::Important => 30,
            Self::Normal => 20,
            Self::Low => 10,
        }
    }

    /// Name as written in rule documents and reports.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "Critical",
            Self::Important => "Important",
            Self::Normal => "Normal",
            Self::Low => "Low",
        }
    }
}

impl fmt::Display for Impact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Impact {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "critical" => Ok(Self::Critical),
            "important" => Ok(Self::Important),
            "normal" => Ok(Self::Normal),
            "low" => Ok(Self::Low),
            _ => Err(format!(
                "unknown impact '{}' (expected Critical, Important, Normal or Low)",
                s
            )),
        }
    }
}

/// Kind of check a validator performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidatorKind {
    /// Series count per metric
    Cardinality,
    /// Metric name shape
    Format,
    /// Label names
    Labels,
    /// Number of label names
    LabelCount,
}

impl ValidatorKind {
    /// Data view this kind of validator reads.
    pub fn data_source(self) -> DataSource {
        match self {
            Self::Cardinality => DataSource::Cardinality,
            Self::Format | Self::Labels | Self::LabelCount => DataSource::Labels,
        }
    }
}

impl FromStr for ValidatorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cardinality" => Ok(Self::Cardinality),
            "format" => Ok(Self::Format),
            "labels" => Ok(Self::Labels),
            "label_count" => Ok(Self::LabelCount),
            _ => Err(format!("unknown validator type '{}'", s)),
        }
    }
}

/// Per-metric view a validator evaluates against.
///
/// The cardinality view exposes `metric_name` and `count`; the labels view
/// exposes `metric_name`, `labels` and `label_count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    /// Metric name and series count
    Cardinality,
    /// Metric name and label names
    Labels,
}

impl DataSource {
    /// Name as written in rule documents.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cardinality => "cardinality",
            Self::Labels => "labels",
        }
    }

    pub(crate) fn provides(self, field: Field) -> bool {
        match field {
            Field::MetricName => true,
            Field::Count => self == Self::Cardinality,
            Field::Labels | Field::LabelCount => self == Self::Labels,
        }
    }
}

impl FromStr for DataSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cardinality" => Ok(Self::Cardinality),
            "labels" => Ok(Self::Labels),
            _ => Err(format!("unknown data source '{}'", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Field {
    MetricName,
    Count,
    Labels,
    LabelCount,
}

impl Field {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::MetricName => "metric_name",
            Self::Count => "count",
            Self::Labels => "labels",
            Self::LabelCount => "label_count",
        }
    }
}

impl FromStr for Field {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "metric_name" => Ok(Self::MetricName),
            "count" => Ok(Self::Count),
            "labels" => Ok(Self::Labels),
            "label_count" => Ok(Self::LabelCount),
            _ => Err(format!("unknown field '{}'", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Operator {
    Lt,
    Lte,
    Gt,
    Gte,
    Eq,
    Ne,
    Contains,
    NotContains,
    Matches,
}

impl Operator {
    /// Comparison for `count` and `label_count`; `ne` is not one.
    pub(crate) fn numeric(self) -> Option<NumericOp> {
        match self {
            Self::Lt => Some(NumericOp::Lt),
            Self::Lte => Some(NumericOp::Lte),
            Self::Gt => Some(NumericOp::Gt),
            Self::Gte => Some(NumericOp::Gte),
            Self::Eq => Some(NumericOp::Eq),
            Self::Ne | Self::Contains | Self::NotContains | Self::Matches => None,
        }
    }
}

impl FromStr for Operator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lt" => Ok(Self::Lt),
            "lte" => Ok(Self::Lte),
            "gt" => Ok(Self::Gt),
            "gte" => Ok(Self::Gte),
            "eq" => Ok(Self::Eq),
            "ne" => Ok(Self::Ne),
            "contains" => Ok(Self::Contains),
            "not_contains" => Ok(Self::NotContains),
            "matches" => Ok(Self::Matches),
            _ => Err(format!("unknown operator '{}'", s)),
        }
    }
}

/// Comparison applied to a numeric field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericOp {
    Lt,
    Lte,
    Gt,
    Gte,
    Eq,
}

impl NumericOp {
    /// Compares `actual` against the configured `expected` value.
    pub fn holds<T: PartialOrd>(self, actual: T, expected: T) -> bool {
        match self {
            Self::Lt => actual < expected,
            Self::Lte => actual <= expected,
            Self::Gt => actual > expected,
            Self::Gte => actual >= expected,
            Self::Eq => actual == expected,
        }
    }
}

/// String test on a single value. `contains` needles are stored lowercased.
#[derive(Debug, Clone)]
pub enum TextMatch {
    Equals(String),
    NotEquals(String),
    Contains(String),
    NotContains(String),
    Matches(Regex),
}

impl TextMatch {
    fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
        haystack.to_lowercase().contains(needle)
    }

    /// Tests one metric name.
    pub fn is_match(&self, actual: &str) -> bool {
        match self {
            Self::Equals(expected) => actual == expected,
            Self::NotEquals(expected) => actual != expected,
            Self::Contains(needle) => Self::contains_ignore_case(actual, needle),
            Self::NotContains(needle) => !Self::contains_ignore_case(actual, needle),
            Self::Matches(regex) => regex.is_match(actual),
        }
    }
}

/// Test over a metric's label-name set.
///
/// The quantifier depends on the operator: `matches` requires every label
/// to match, `contains` and `eq` need one label, `not_contains` and `ne`
/// need no label to hit.
#[derive(Debug, Clone)]
pub enum LabelSetMatch {
    AnyEquals(String),
    NoneEquals(String),
    AnyContains(String),
    NoneContains(String),
    AllMatch(Regex),
}

impl LabelSetMatch {
    /// Tests the label names of one metric.
    pub fn is_match(&self, labels: &[String]) -> bool {
        match self {
            Self::AnyEquals(expected) => labels.iter().any(|l| l == expected),
            Self::NoneEquals(expected) => labels.iter().all(|l| l != expected),
            Self::AnyContains(needle) => labels
                .iter()
                .any(|l| TextMatch::contains_ignore_case(l, needle)),
            Self::NoneContains(needle) => !labels
                .iter()
                .any(|l| TextMatch::contains_ignore_case(l, needle)),
            Self::AllMatch(regex) => labels.iter().all(|l| regex.is_match(l)),
        }
    }
}

/// A single compiled condition.
#[derive(Debug, Clone)]
pub enum Predicate {
    /// `count` field of the cardinality view
    Count { op: NumericOp, value: f64 },
    /// `label_count` field of the labels view
    LabelCount { op: NumericOp, value: i64 },
    /// `metric_name` field of either view
    MetricName(TextMatch),
    /// `labels` field of the labels view
    Labels(LabelSetMatch),
}

impl Predicate {
    /// Whether `record` satisfies the condition.
    pub fn holds(&self, record: &MetricRecord) -> bool {
        match self {
            Self::Count { op, value } => op.holds(record.cardinality as f64, *value),
            Self::LabelCount { op, value } => op.holds(record.label_count() as i64, *value),
            Self::MetricName(text) => text.is_match(&record.metric_name),
            Self::Labels(set) => set.is_match(&record.labels),
        }
    }
}

/// A compiled validator: all conditions must hold for a metric to pass.
#[derive(Debug, Clone)]
pub struct Validator {
    pub name: String,
    pub kind: ValidatorKind,
    pub data_source: DataSource,
    pub ui_title: Option<String>,
    pub ui_description: Option<String>,
    pub parameters: BTreeMap<String, serde_yaml::Value>,
    pub conditions: Vec<Predicate>,
}

impl Validator {
    /// True when every condition holds for `record`.
    pub fn passes(&self, record: &MetricRecord) -> bool {
        self.conditions.iter().all(|condition| condition.holds(record))
    }

    /// Whether this validator's metrics feed the cardinality sums.
    pub fn weighs_cardinality(&self) -> bool {
        self.data_source == DataSource::Cardinality
    }
}

/// A compiled rule: an impact level and the validators scored under it.
#[derive(Debug, Clone)]
pub struct Rule {
    pub rule_id: String,
    pub description: String,
    pub impact: Impact,
    pub validators: Vec<Validator>,
}
