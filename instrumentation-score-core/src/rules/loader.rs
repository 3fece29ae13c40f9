//! Rule document loading and compilation.
//!
//! Loading is all-or-nothing: the first schema violation fails the whole
//! document and no partial [`RuleSet`] is ever returned.

use regex::Regex;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

use super::compiled::{
    DataSource, Field, Impact, LabelSetMatch, Operator, Predicate, Rule, TextMatch, Validator,
    ValidatorKind,
};
use super::definition::{ConditionConfig, RuleDefinition, RulesDocument, ValidatorConfig};
use super::exclusion::ExclusionFilter;
use crate::error::{Result, ScoreError};

/// Compiled rules plus exclusion list.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<Rule>,
    exclusions: ExclusionFilter,
    document: RulesDocument,
}

impl RuleSet {
    /// Reads and compiles a YAML rule document.
    pub async fn load(path: &Path) -> Result<Self> {
        let text = tokio::fs::read_to_string(path).await.map_err(|e| {
            ScoreError::io(format!("Failed to read rule file {}", path.display()), e)
        })?;
        let rule_set = Self::from_yaml_str(&text)?;
        info!(
            "Loaded {} rules and {} exclusions from {}",
            rule_set.rules.len(),
            rule_set.document.exclusion_list.len(),
            path.display()
        );
        Ok(rule_set)
    }

    /// Parses and compiles a YAML rule document held in memory.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let document: RulesDocument = serde_yaml::from_str(text).map_err(|e| ScoreError::Yaml {
            context: "Failed to parse rule document".to_string(),
            source: e,
        })?;
        Self::compile(document)
    }

    /// Validates and compiles an already parsed document.
    pub fn compile(document: RulesDocument) -> Result<Self> {
        if document.rules.is_empty() {
            return Err(ScoreError::rule_definition("rule document defines no rules"));
        }

        let exclusions = ExclusionFilter::compile(&document.exclusion_list)?;

        let mut seen = HashSet::new();
        let mut rules = Vec::with_capacity(document.rules.len());
        for definition in &document.rules {
            if !seen.insert(definition.rule_id.as_str()) {
                return Err(ScoreError::rule_definition(format!(
                    "duplicate rule_id '{}'",
                    definition.rule_id
                )));
            }
            rules.push(compile_rule(definition)?);
        }
        debug!("Compiled {} rules", rules.len());

        Ok(Self {
            rules,
            exclusions,
            document,
        })
    }

    /// Rules in document order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Compiled exclusion list.
    pub fn exclusions(&self) -> &ExclusionFilter {
        &self.exclusions
    }

    /// The document the set was compiled from.
    pub fn document(&self) -> &RulesDocument {
        &self.document
    }
}

fn compile_rule(definition: &RuleDefinition) -> Result<Rule> {
    let rule_id = definition.rule_id.trim();
    if rule_id.is_empty() {
        return Err(ScoreError::rule_definition("rule with empty rule_id"));
    }

    let impact: Impact = definition
        .impact
        .parse()
        .map_err(|e| ScoreError::rule_definition(format!("rule '{}': {}", rule_id, e)))?;

    if definition.validators.is_empty() {
        return Err(ScoreError::rule_definition(format!(
            "rule '{}' has no validators",
            rule_id
        )));
    }

    let validators = definition
        .validators
        .iter()
        .map(|v| compile_validator(rule_id, v))
        .collect::<Result<Vec<_>>>()?;

    Ok(Rule {
        rule_id: rule_id.to_string(),
        description: definition.description.clone(),
        impact,
        validators,
    })
}

fn compile_validator(rule_id: &str, config: &ValidatorConfig) -> Result<Validator> {
    let invalid = |reason: String| ScoreError::invalid_condition(rule_id, &config.name, reason);

    if config.name.trim().is_empty() {
        return Err(ScoreError::rule_definition(format!(
            "rule '{}' has a validator with an empty name",
            rule_id
        )));
    }

    let kind: ValidatorKind = config.validator_type.parse().map_err(invalid)?;
    let data_source: DataSource = config.data_source.parse().map_err(invalid)?;
    if kind.data_source() != data_source {
        return Err(invalid(format!(
            "validator type '{}' reads the {} view, not '{}'",
            config.validator_type,
            kind.data_source().as_str(),
            config.data_source
        )));
    }

    if config.conditions.is_empty() {
        return Err(invalid("validator has no conditions".to_string()));
    }

    let conditions = config
        .conditions
        .iter()
        .map(|c| compile_condition(data_source, c).map_err(invalid))
        .collect::<Result<Vec<_>>>()?;

    Ok(Validator {
        name: config.name.clone(),
        kind,
        data_source,
        ui_title: config.ui_title.clone(),
        ui_description: config.ui_description.clone(),
        parameters: config.parameters.clone(),
        conditions,
    })
}

fn compile_regex(pattern: &str) -> std::result::Result<Regex, String> {
    Regex::new(pattern).map_err(|e| format!("invalid regex '{}': {}", pattern, e))
}

fn compile_condition(
    data_source: DataSource,
    condition: &ConditionConfig,
) -> std::result::Result<Predicate, String> {
    let field: Field = condition.field.parse()?;
    if !data_source.provides(field) {
        return Err(format!(
            "field '{}' is not available in the {} view",
            field.as_str(),
            data_source.as_str()
        ));
    }

    let operator: Operator = condition.operator.parse()?;
    let value = &condition.value;
    let not_allowed = || {
        format!(
            "operator '{}' is not valid for field '{}'",
            condition.operator,
            field.as_str()
        )
    };
    let wrong_type = |expected: &str| {
        format!(
            "field '{}' with operator '{}' needs {} value, got {} {}",
            field.as_str(),
            condition.operator,
            expected,
            value.kind(),
            value
        )
    };

    match field {
        Field::Count => {
            let op = operator.numeric().ok_or_else(not_allowed)?;
            let value = value.as_number().ok_or_else(|| wrong_type("a numeric"))?;
            Ok(Predicate::Count { op, value })
        }
        Field::LabelCount => {
            let op = operator.numeric().ok_or_else(not_allowed)?;
            let value = value.as_integer().ok_or_else(|| wrong_type("an integer"))?;
            Ok(Predicate::LabelCount { op, value })
        }
        Field::MetricName => {
            let text = value.as_text().ok_or_else(|| wrong_type("a string"))?;
            let matcher = match operator {
                Operator::Eq => TextMatch::Equals(text.to_string()),
                Operator::Ne => TextMatch::NotEquals(text.to_string()),
                Operator::Contains => TextMatch::Contains(text.to_lowercase()),
                Operator::NotContains => TextMatch::NotContains(text.to_lowercase()),
                Operator::Matches => TextMatch::Matches(compile_regex(text)?),
                _ => return Err(not_allowed()),
            };
            Ok(Predicate::MetricName(matcher))
        }
        Field::Labels => {
            let text = value.as_text().ok_or_else(|| wrong_type("a string"))?;
            let matcher = match operator {
                Operator::Eq => LabelSetMatch::AnyEquals(text.to_string()),
                Operator::Ne => LabelSetMatch::NoneEquals(text.to_string()),
                Operator::Contains => LabelSetMatch::AnyContains(text.to_lowercase()),
                Operator::NotContains => LabelSetMatch::NoneContains(text.to_lowercase()),
                Operator::Matches => LabelSetMatch::AllMatch(compile_regex(text)?),
                _ => return Err(not_allowed()),
            };
            Ok(Predicate::Labels(matcher))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MetricRecord;

    const VALID: &str = r#"
exclusion_list:
  - job: "node-exporter"
rules:
  - rule_id: "PROM-MET-02"
    description: "Keep cardinality bounded"
    impact: "Critical"
    validators:
      - name: "cardinality_limit"
        type: "cardinality"
        data_source: "cardinality"
        conditions:
          - field: "count"
            operator: "lt"
            value: 10000
  - rule_id: "PROM-LBL-01"
    impact: "Important"
    validators:
      - name: "no_user_labels"
        type: "labels"
        data_source: "labels"
        conditions:
          - field: "labels"
            operator: "not_contains"
            value: "user_id"
          - field: "label_count"
            operator: "lte"
            value: 10
"#;

    fn rules_with_validator(validator: &str) -> String {
        format!(
            "rules:\n  - rule_id: \"R1\"\n    impact: \"Low\"\n    validators:\n{}",
            validator
        )
    }

    fn expect_invalid_condition(yaml: &str, needle: &str) {
        match RuleSet::from_yaml_str(yaml) {
            Err(ScoreError::InvalidCondition {
                rule_id,
                validator,
                reason,
            }) => {
                assert_eq!(rule_id, "R1");
                assert_eq!(validator, "v");
                assert!(reason.contains(needle), "unexpected reason: {}", reason);
            }
            other => panic!("expected InvalidCondition, got {:?}", other),
        }
    }

    #[test]
    fn test_load_valid_document() {
        let rule_set = RuleSet::from_yaml_str(VALID).unwrap();
        assert_eq!(rule_set.rules().len(), 2);
        assert_eq!(rule_set.rules()[0].impact, Impact::Critical);
        assert_eq!(rule_set.rules()[1].validators[0].conditions.len(), 2);
        assert!(rule_set.exclusions().is_job_excluded("node-exporter"));
        assert_eq!(rule_set.document().rules.len(), 2);
    }

    #[test]
    fn test_unknown_validator_type() {
        let yaml = rules_with_validator(
            "      - name: \"v\"\n        type: \"histogram\"\n        data_source: \"labels\"\n        conditions:\n          - {field: \"labels\", operator: \"contains\", value: \"x\"}\n",
        );
        expect_invalid_condition(&yaml, "unknown validator type");
    }

    #[test]
    fn test_type_and_data_source_mismatch() {
        let yaml = rules_with_validator(
            "      - name: \"v\"\n        type: \"cardinality\"\n        data_source: \"labels\"\n        conditions:\n          - {field: \"metric_name\", operator: \"eq\", value: \"x\"}\n",
        );
        expect_invalid_condition(&yaml, "reads the cardinality view");
    }

    #[test]
    fn test_field_not_in_view() {
        let yaml = rules_with_validator(
            "      - name: \"v\"\n        type: \"labels\"\n        data_source: \"labels\"\n        conditions:\n          - {field: \"count\", operator: \"lt\", value: 3}\n",
        );
        expect_invalid_condition(&yaml, "not available in the labels view");
    }

    #[test]
    fn test_operator_not_valid_for_field() {
        let yaml = rules_with_validator(
            "      - name: \"v\"\n        type: \"label_count\"\n        data_source: \"labels\"\n        conditions:\n          - {field: \"label_count\", operator: \"matches\", value: \"x\"}\n",
        );
        expect_invalid_condition(&yaml, "not valid for field 'label_count'");
    }

    #[test]
    fn test_ne_rejected_for_numeric_fields() {
        let yaml = rules_with_validator(
            "      - name: \"v\"\n        type: \"label_count\"\n        data_source: \"labels\"\n        conditions:\n          - {field: \"label_count\", operator: \"ne\", value: 3}\n",
        );
        expect_invalid_condition(&yaml, "operator 'ne' is not valid for field 'label_count'");

        let yaml = rules_with_validator(
            "      - name: \"v\"\n        type: \"cardinality\"\n        data_source: \"cardinality\"\n        conditions:\n          - {field: \"count\", operator: \"ne\", value: 100}\n",
        );
        expect_invalid_condition(&yaml, "operator 'ne' is not valid for field 'count'");
    }

    #[test]
    fn test_ne_on_names_and_labels() {
        let yaml = rules_with_validator(
            "      - name: \"v\"\n        type: \"labels\"\n        data_source: \"labels\"\n        conditions:\n          - {field: \"metric_name\", operator: \"ne\", value: \"up\"}\n          - {field: \"labels\", operator: \"ne\", value: \"user_id\"}\n",
        );
        let rule_set = RuleSet::from_yaml_str(&yaml).unwrap();
        let validator = &rule_set.rules()[0].validators[0];

        let record = |metric: &str, label: &str| MetricRecord::new("api", metric, vec![label.into()], 1);
        assert!(validator.passes(&record("http_requests_total", "method")));
        assert!(!validator.passes(&record("up", "method")));
        assert!(!validator.passes(&record("sessions", "user_id")));
    }

    #[test]
    fn test_value_type_mismatch() {
        let yaml = rules_with_validator(
            "      - name: \"v\"\n        type: \"label_count\"\n        data_source: \"labels\"\n        conditions:\n          - {field: \"label_count\", operator: \"lt\", value: 2.5}\n",
        );
        expect_invalid_condition(&yaml, "needs an integer value");

        let yaml = rules_with_validator(
            "      - name: \"v\"\n        type: \"cardinality\"\n        data_source: \"cardinality\"\n        conditions:\n          - {field: \"count\", operator: \"lt\", value: \"many\"}\n",
        );
        expect_invalid_condition(&yaml, "needs a numeric value");
    }

    #[test]
    fn test_invalid_regex_in_condition() {
        let yaml = rules_with_validator(
            "      - name: \"v\"\n        type: \"format\"\n        data_source: \"labels\"\n        conditions:\n          - {field: \"metric_name\", operator: \"matches\", value: \"([a-z\"}\n",
        );
        expect_invalid_condition(&yaml, "invalid regex");
    }

    #[test]
    fn test_unknown_operator() {
        let yaml = rules_with_validator(
            "      - name: \"v\"\n        type: \"format\"\n        data_source: \"labels\"\n        conditions:\n          - {field: \"metric_name\", operator: \"startswith\", value: \"x\"}\n",
        );
        expect_invalid_condition(&yaml, "unknown operator");
    }

    #[test]
    fn test_document_level_errors() {
        let cases = [
            ("rules: []", "no rules"),
            (
                "rules:\n  - {rule_id: \"R1\", impact: \"Severe\", validators: []}",
                "unknown impact",
            ),
            (
                "rules:\n  - {rule_id: \"R1\", impact: \"Low\", validators: []}",
                "no validators",
            ),
        ];
        for (yaml, needle) in cases {
            match RuleSet::from_yaml_str(yaml) {
                Err(ScoreError::RuleDefinition { message }) => {
                    assert!(message.contains(needle), "unexpected message: {}", message)
                }
                other => panic!("expected RuleDefinition for {:?}, got {:?}", yaml, other),
            }
        }
    }

    #[test]
    fn test_duplicate_rule_id() {
        let yaml = format!("{}{}", VALID, VALID.split("rules:\n").nth(1).unwrap());
        let result = RuleSet::from_yaml_str(&yaml);
        assert!(matches!(
            result,
            Err(ScoreError::RuleDefinition { message }) if message.contains("duplicate")
        ));
    }

    #[test]
    fn test_empty_conditions_rejected() {
        let yaml = rules_with_validator(
            "      - name: \"v\"\n        type: \"format\"\n        data_source: \"labels\"\n        conditions: []\n",
        );
        expect_invalid_condition(&yaml, "no conditions");
    }

    #[test]
    fn test_invalid_exclusion_pattern_fails_whole_document() {
        let yaml = format!(
            "exclusion_list:\n  - job_name_pattern: \"[\"\n{}",
            VALID.replace("exclusion_list:\n  - job: \"node-exporter\"\n", "")
        );
        assert!(matches!(
            RuleSet::from_yaml_str(&yaml),
            Err(ScoreError::RuleDefinition { .. })
        ));
    }

    #[test]
    fn test_malformed_yaml() {
        assert!(matches!(
            RuleSet::from_yaml_str("rules: [unterminated"),
            Err(ScoreError::Yaml { .. })
        ));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules_config.yaml");
        tokio::fs::write(&path, VALID).await.unwrap();
        let rule_set = RuleSet::load(&path).await.unwrap();
        assert_eq!(rule_set.rules().len(), 2);

        let missing = RuleSet::load(&dir.path().join("missing.yaml")).await;
        assert!(matches!(missing, Err(ScoreError::Io { .. })));
    }
}
