//! Caller-input validation against pipeline metadata.
//!
//! Normalizes a free-form rule map into typed [`Rules`], injects declared
//! defaults for absent optional rules, and checks required names and
//! numeric limits. Validation collects every problem it finds rather than
//! stopping at the first.

use serde_json::Value;
use thiserror::Error;

use super::context::Goal;
use super::metadata::PipelineMetadata;
use super::rules::{RuleValue, Rules};

/// A rejected goal or rule map.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// The goal text is missing or empty.
    #[error("Goal text must not be empty")]
    EmptyGoal,

    /// A required rule name is absent from the normalized map.
    #[error("Required rule '{0}' is missing")]
    MissingRule(String),

    /// A numeric rule falls outside its declared limit.
    #[error("Rule '{name}' value {value} is outside [{min}, {max}]")]
    OutOfRange {
        name: String,
        value: f64,
        min: f64,
        max: f64,
    },

    /// A rule declared with a numeric limit is not numeric.
    #[error("Rule '{name}' must be numeric, got {actual}")]
    NotNumeric { name: String, actual: &'static str },
}

/// Rejects a goal with missing or empty text.
pub fn validate_goal(goal: &Goal) -> Result<(), ValidationError> {
    if goal.text.trim().is_empty() {
        return Err(ValidationError::EmptyGoal);
    }
    Ok(())
}

/// Normalizes untyped caller input into a typed rule map.
///
/// Bare JSON values map structurally onto [`RuleValue`]; entries that are
/// already in tagged rule shape (`{"type": ..., "value": ...}`) pass
/// through unchanged.
pub fn normalize_rules<I>(raw: I) -> Rules
where
    I: IntoIterator<Item = (String, Value)>,
{
    raw.into_iter()
        .map(|(name, value)| {
            let rule = match serde_json::from_value::<RuleValue>(value.clone()) {
                Ok(typed) => typed,
                Err(_) => RuleValue::from(value),
            };
            (name, rule)
        })
        .collect()
}

/// Validates a normalized rule map against a pipeline's metadata.
///
/// Injects defaults for absent optional rules, then checks every required
/// name is present and every limited rule is numeric and in range. Returns
/// the completed rule map or every violation found.
pub fn validate_rules(
    mut rules: Rules,
    metadata: &PipelineMetadata,
) -> Result<Rules, Vec<ValidationError>> {
    for (name, default) in &metadata.defaults {
        rules.entry(name.clone()).or_insert_with(|| default.clone());
    }

    let mut errors = Vec::new();

    for required in &metadata.required_rules {
        if !rules.contains_key(required) {
            errors.push(ValidationError::MissingRule(required.clone()));
        }
    }

    for (name, limit) in &metadata.limits {
        if let Some(rule) = rules.get(name) {
            match rule.as_num() {
                Some(value) if !limit.contains(value) => {
                    errors.push(ValidationError::OutOfRange {
                        name: name.clone(),
                        value,
                        min: limit.min,
                        max: limit.max,
                    });
                }
                Some(_) => {}
                None => errors.push(ValidationError::NotNumeric {
                    name: name.clone(),
                    actual: rule.type_name(),
                }),
            }
        }
    }

    if errors.is_empty() {
        Ok(rules)
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::rules::rules_from;
    use serde_json::json;

    fn metadata() -> PipelineMetadata {
        PipelineMetadata::new("p", "P", "", "1.0.0", vec![])
            .with_required(&["theme"])
            .with_optional("count", RuleValue::Num(10.0))
            .with_limit("count", 1.0, 50.0)
    }

    #[test]
    fn test_goal_rejects_empty_text() {
        assert_eq!(
            validate_goal(&Goal::new("   ")),
            Err(ValidationError::EmptyGoal)
        );
        assert!(validate_goal(&Goal::new("build a set")).is_ok());
    }

    #[test]
    fn test_normalize_bare_values() {
        let rules = normalize_rules(vec![
            ("theme".to_string(), json!("history")),
            ("count".to_string(), json!(12)),
            ("strict".to_string(), json!(true)),
        ]);
        assert_eq!(rules["theme"], RuleValue::Str("history".into()));
        assert_eq!(rules["count"], RuleValue::Num(12.0));
        assert_eq!(rules["strict"], RuleValue::Bool(true));
    }

    #[test]
    fn test_normalize_passes_through_typed_shape() {
        let rules = normalize_rules(vec![(
            "count".to_string(),
            json!({"type": "num", "value": 7.0}),
        )]);
        assert_eq!(rules["count"], RuleValue::Num(7.0));
    }

    #[test]
    fn test_missing_required_rule_is_named() {
        let result = validate_rules(Rules::new(), &metadata());
        let errors = result.expect_err("theme is required");
        assert!(errors.contains(&ValidationError::MissingRule("theme".into())));
    }

    #[test]
    fn test_defaults_injected_for_optional_rules() {
        let rules = rules_from([("theme", RuleValue::from("space"))]);
        let validated = validate_rules(rules, &metadata()).expect("valid");
        assert_eq!(validated["count"], RuleValue::Num(10.0));
    }

    #[test]
    fn test_limit_enforced() {
        let rules = rules_from([
            ("theme", RuleValue::from("space")),
            ("count", RuleValue::from(99i64)),
        ]);
        let errors = validate_rules(rules, &metadata()).expect_err("out of range");
        assert!(matches!(errors[0], ValidationError::OutOfRange { .. }));
    }

    #[test]
    fn test_limited_rule_must_be_numeric() {
        let rules = rules_from([
            ("theme", RuleValue::from("space")),
            ("count", RuleValue::from("ten")),
        ]);
        let errors = validate_rules(rules, &metadata()).expect_err("not numeric");
        assert!(matches!(errors[0], ValidationError::NotNumeric { .. }));
    }

    #[test]
    fn test_all_violations_collected() {
        let rules = rules_from([("count", RuleValue::from(0i64))]);
        let errors = validate_rules(rules, &metadata()).expect_err("two problems");
        assert_eq!(errors.len(), 2);
    }
}
