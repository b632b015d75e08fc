//! Static pipeline descriptors and their registry.
//!
//! Every named pipeline carries one immutable [`PipelineMetadata`] instance
//! describing its task order and the rule names it accepts. Validation
//! checks caller input against this descriptor before the executor runs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::rules::RuleValue;

/// Inclusive numeric bounds for a named rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NumericLimit {
    /// Smallest accepted value.
    pub min: f64,
    /// Largest accepted value.
    pub max: f64,
}

impl NumericLimit {
    /// Creates a limit spanning `min..=max`.
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Whether `value` falls within the limit.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Static, versioned descriptor of one named pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineMetadata {
    /// Stable pipeline identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// One-line description.
    pub description: String,
    /// Descriptor version.
    pub version: String,
    /// Ordered task ids, matching the executor's task list.
    pub task_ids: Vec<String>,
    /// Rule names that must be present after validation.
    pub required_rules: Vec<String>,
    /// Rule names the pipeline recognizes but does not require.
    pub optional_rules: Vec<String>,
    /// Defaults injected for absent optional rules.
    pub defaults: BTreeMap<String, RuleValue>,
    /// Numeric bounds for named rules.
    pub limits: BTreeMap<String, NumericLimit>,
}

impl PipelineMetadata {
    /// Creates a descriptor with empty rule tables.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        version: impl Into<String>,
        task_ids: Vec<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            version: version.into(),
            task_ids,
            required_rules: Vec::new(),
            optional_rules: Vec::new(),
            defaults: BTreeMap::new(),
            limits: BTreeMap::new(),
        }
    }

    /// Declares required rule names.
    pub fn with_required(mut self, names: &[&str]) -> Self {
        self.required_rules = names.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Declares an optional rule with a default value.
    pub fn with_optional(mut self, name: &str, default: RuleValue) -> Self {
        self.optional_rules.push(name.to_string());
        self.defaults.insert(name.to_string(), default);
        self
    }

    /// Declares a numeric limit for a named rule.
    pub fn with_limit(mut self, name: &str, min: f64, max: f64) -> Self {
        self.limits.insert(name.to_string(), NumericLimit::new(min, max));
        self
    }
}

/// Lookup table of every registered pipeline descriptor.
#[derive(Debug, Default)]
pub struct PipelineRegistry {
    entries: BTreeMap<String, PipelineMetadata>,
}

impl PipelineRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a descriptor, replacing any existing entry with the same id.
    pub fn register(&mut self, metadata: PipelineMetadata) {
        self.entries.insert(metadata.id.clone(), metadata);
    }

    /// Looks up a descriptor by pipeline id.
    pub fn get(&self, id: &str) -> Option<&PipelineMetadata> {
        self.entries.get(id)
    }

    /// All registered descriptors, ordered by id.
    pub fn all(&self) -> impl Iterator<Item = &PipelineMetadata> {
        self.entries.values()
    }
}
