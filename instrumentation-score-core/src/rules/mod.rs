//! Declarative rule definitions.
//!
//! A YAML document holds an `exclusion_list` and a list of `rules`. It is
//! parsed into the raw [`definition`] types, then compiled into a
//! [`RuleSet`] whose validators carry typed predicates and precompiled
//! regular expressions.

pub mod definition;

mod compiled;
mod exclusion;
mod loader;

pub use compiled::{
    DataSource, Impact, LabelSetMatch, NumericOp, Predicate, Rule, TextMatch, Validator,
    ValidatorKind,
};
pub use definition::{
    ConditionConfig, ConditionValue, ExclusionEntry, RuleDefinition, RulesDocument,
    ValidatorConfig,
};
pub use exclusion::{Exclusion, ExclusionFilter};
pub use loader::RuleSet;
