//! Task and pipeline outcome types.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::TaskError;
use super::progress::TaskProgress;

/// Outcome of one task execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    /// Id of the task that produced this result.
    pub task_id: String,
    /// Whether the task succeeded.
    pub success: bool,
    /// Opaque data payload for downstream tasks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Structured errors raised by the task.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<TaskError>,
    /// Non-fatal warnings raised by the task.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    /// Metadata merged into the run context when the result is recorded.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl TaskResult {
    /// Creates a successful result with a data payload.
    pub fn ok(task_id: impl Into<String>, data: Value) -> Self {
        Self {
            task_id: task_id.into(),
            success: true,
            data: Some(data),
            errors: Vec::new(),
            warnings: Vec::new(),
            metadata: Map::new(),
        }
    }

    /// Creates a failed result carrying one structured error.
    pub fn failed(task_id: impl Into<String>, error: TaskError) -> Self {
        Self {
            task_id: task_id.into(),
            success: false,
            data: None,
            errors: vec![error],
            warnings: Vec::new(),
            metadata: Map::new(),
        }
    }

    /// Appends a warning to the result.
    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    /// Inserts a metadata entry on the result.
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// The first structured error, if any.
    pub fn first_error(&self) -> Option<&TaskError> {
        self.errors.first()
    }
}

/// Terminal status of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStatus {
    /// Every task succeeded.
    Success,
    /// At least one task failed but the caller opted into partial results.
    Partial,
    /// The run failed.
    Error,
}

impl std::fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineStatus::Success => write!(f, "success"),
            PipelineStatus::Partial => write!(f, "partial"),
            PipelineStatus::Error => write!(f, "error"),
        }
    }
}

/// The aggregate returned to the caller after a pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    /// Overall run status.
    pub status: PipelineStatus,
    /// Id of the pipeline that ran.
    pub pipeline_id: String,
    /// Display name of the pipeline.
    pub pipeline_name: String,
    /// Every settled task result, in execution order.
    pub task_results: Vec<TaskResult>,
    /// Every progress event emitted during the run, in emission order.
    pub progress: Vec<TaskProgress>,
    /// The last settled task's data payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_result: Option<Value>,
    /// All task errors, flattened in execution order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<TaskError>,
    /// All task warnings, flattened in execution order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    /// Wall-clock duration of the run.
    #[serde(with = "duration_millis")]
    pub elapsed: Duration,
    /// Metadata merged from every task result.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl PipelineResult {
    /// Whether the run completed without any task failure.
    pub fn is_success(&self) -> bool {
        self.status == PipelineStatus::Success
    }

    /// The result for a specific task, if it settled.
    pub fn result_for(&self, task_id: &str) -> Option<&TaskResult> {
        self.task_results.iter().find(|r| r.task_id == task_id)
    }
}

/// Serializes `Duration` as integer milliseconds.
mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(d)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_result() {
        let result = TaskResult::ok("normalize-content", serde_json::json!({"chars": 120}));
        assert!(result.success);
        assert!(result.errors.is_empty());
        assert_eq!(result.data.as_ref().map(|d| d["chars"].clone()), Some(serde_json::json!(120)));
    }

    #[test]
    fn test_failed_result_carries_error() {
        let err = TaskError::new("DATABASE_ERROR", "persist-set", "insert rejected");
        let result = TaskResult::failed("persist-set", err.clone());
        assert!(!result.success);
        assert_eq!(result.first_error(), Some(&err));
    }

    #[test]
    fn test_warnings_are_additive() {
        let result = TaskResult::ok("select-questions", serde_json::json!([]))
            .with_warning("requested 10, selected 3")
            .with_warning("difficulty spread uneven");
        assert_eq!(result.warnings.len(), 2);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(PipelineStatus::Success.to_string(), "success");
        assert_eq!(PipelineStatus::Partial.to_string(), "partial");
        assert_eq!(PipelineStatus::Error.to_string(), "error");
    }

    #[test]
    fn test_duration_serializes_as_millis() {
        let result = PipelineResult {
            status: PipelineStatus::Success,
            pipeline_id: "p".into(),
            pipeline_name: "P".into(),
            task_results: Vec::new(),
            progress: Vec::new(),
            final_result: None,
            errors: Vec::new(),
            warnings: Vec::new(),
            elapsed: Duration::from_millis(1500),
            metadata: Map::new(),
        };
        let json = serde_json::to_value(&result).expect("serialize");
        assert_eq!(json["elapsed"], 1500);
    }
}
