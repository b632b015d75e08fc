//! Typed rule values supplied by pipeline callers.
//!
//! Rules are the named, typed knobs a caller passes alongside a goal. The
//! original system inferred a rule's type from an untyped value at runtime;
//! here the type space is a closed enum and untyped JSON is mapped
//! structurally at the boundary, so downstream tasks never re-inspect types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A named rule's typed payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum RuleValue {
    /// Free-form text value.
    Str(String),
    /// Numeric value (integers and floats share one representation).
    Num(f64),
    /// Boolean flag.
    Bool(bool),
    /// Ordered list of untyped items.
    Array(Vec<Value>),
    /// Structured object payload.
    Object(serde_json::Map<String, Value>),
}

/// A caller-supplied rule map, keyed by rule name.
///
/// `BTreeMap` keeps iteration deterministic, which keeps validation error
/// ordering and metadata output stable across runs.
pub type Rules = BTreeMap<String, RuleValue>;

impl RuleValue {
    /// Returns the string payload, if this is a string rule.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            RuleValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the numeric payload, if this is a numeric rule.
    pub fn as_num(&self) -> Option<f64> {
        match self {
            RuleValue::Num(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the boolean payload, if this is a boolean rule.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            RuleValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the array payload, if this is an array rule.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            RuleValue::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the object payload, if this is an object rule.
    pub fn as_object(&self) -> Option<&serde_json::Map<String, Value>> {
        match self {
            RuleValue::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Short name of the variant, used in validation messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            RuleValue::Str(_) => "string",
            RuleValue::Num(_) => "number",
            RuleValue::Bool(_) => "boolean",
            RuleValue::Array(_) => "array",
            RuleValue::Object(_) => "object",
        }
    }
}

impl From<Value> for RuleValue {
    /// Maps an untyped JSON value onto the closed rule type space.
    ///
    /// Null maps to an empty string, matching the original system's
    /// "anything unrecognized is a string" default.
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => RuleValue::Str(s),
            Value::Number(n) => RuleValue::Num(n.as_f64().unwrap_or(0.0)),
            Value::Bool(b) => RuleValue::Bool(b),
            Value::Array(items) => RuleValue::Array(items),
            Value::Object(map) => RuleValue::Object(map),
            Value::Null => RuleValue::Str(String::new()),
        }
    }
}

impl From<&str> for RuleValue {
    fn from(s: &str) -> Self {
        RuleValue::Str(s.to_string())
    }
}

impl From<String> for RuleValue {
    fn from(s: String) -> Self {
        RuleValue::Str(s)
    }
}

impl From<f64> for RuleValue {
    fn from(n: f64) -> Self {
        RuleValue::Num(n)
    }
}

impl From<i64> for RuleValue {
    fn from(n: i64) -> Self {
        RuleValue::Num(n as f64)
    }
}

impl From<bool> for RuleValue {
    fn from(b: bool) -> Self {
        RuleValue::Bool(b)
    }
}

/// Builds a rule map from name/value pairs.
pub fn rules_from<I, K, V>(pairs: I) -> Rules
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<RuleValue>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
