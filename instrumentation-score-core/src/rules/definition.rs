//! Raw rule document as written in YAML.
//!
//! These types mirror the file one-to-one and are never evaluated directly.
//! [`RuleSet::from_yaml_str`](super::RuleSet::from_yaml_str) compiles them
//! into checked, typed rules.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Top-level rule document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RulesDocument {
    #[serde(default)]
    pub exclusion_list: Vec<ExclusionEntry>,
    #[serde(default)]
    pub rules: Vec<RuleDefinition>,
}

/// Removes a job, or some of its metrics, from scoring.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionEntry {
    /// Exact job name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job: Option<String>,
    /// Regular expression searched in the job name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_name_pattern: Option<String>,
    /// Metric names to drop; empty excludes the whole job
    #[serde(default)]
    pub metrics: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDefinition {
    pub rule_id: String,
    #[serde(default)]
    pub description: String,
    pub impact: String,
    #[serde(default)]
    pub validators: Vec<ValidatorConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub validator_type: String,
    pub data_source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui_description: Option<String>,
    #[serde(default)]
    pub conditions: Vec<ConditionConfig>,
    /// Free-form settings kept for display only
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, serde_yaml::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionConfig {
    pub field: String,
    pub operator: String,
    pub value: ConditionValue,
}

/// Condition operand: YAML integers, floats and strings are kept apart so the
/// compiler can check them against the operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl ConditionValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Integer(value) => Some(*value as f64),
            Self::Float(value) => Some(*value),
            Self::Text(_) => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::Text(_) => "string",
        }
    }
}

impl std::fmt::Display for ConditionValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integer(value) => write!(f, "{}", value),
            Self::Float(value) => write!(f, "{}", value),
            Self::Text(value) => write!(f, "{:?}", value),
        }
    }
}
