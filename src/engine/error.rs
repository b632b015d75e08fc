//! Structured task failure representation.
//!
//! Every task in a pipeline reports failures through the same shape: an
//! error code, a human-readable message, the originating task id, optional
//! structured detail, and a retryable flag. Errors travel inside
//! [`TaskResult`](super::result::TaskResult)s rather than being propagated
//! up the call stack, so callers always receive the full failure picture.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Well-known error codes shared across pipelines.
pub mod codes {
    /// A task's pre-flight `validate` rejected the current context.
    pub const VALIDATION_FAILED: &str = "VALIDATION_FAILED";
    /// An unexpected failure escaped the executor's run loop.
    pub const EXECUTION_ERROR: &str = "EXECUTION_ERROR";
    /// A task exceeded its configured timeout.
    pub const TASK_TIMEOUT: &str = "TASK_TIMEOUT";
    /// The candidate pool cannot satisfy the requested set size.
    pub const INSUFFICIENT_QUESTIONS: &str = "INSUFFICIENT_QUESTIONS";
    /// Selection produced an empty set.
    pub const NO_SELECTED_QUESTIONS: &str = "NO_SELECTED_QUESTIONS";
    /// The record store rejected an operation.
    pub const DATABASE_ERROR: &str = "DATABASE_ERROR";
    /// The AI endpoint failed to produce a usable payload.
    pub const AI_EXTRACTION_FAILED: &str = "AI_EXTRACTION_FAILED";
    /// The build-trivia-set pipeline was invoked without a usable theme.
    pub const MISSING_THEME: &str = "MISSING_THEME";
    /// The AI endpoint reported resource exhaustion; safe to retry shortly.
    pub const RATE_LIMITED: &str = "429";
}

/// A structured failure raised by a pipeline task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskError {
    /// Machine-readable error code (see [`codes`]).
    pub code: String,
    /// Human-readable description of the failure.
    pub message: String,
    /// Id of the task that raised the error.
    pub task_id: String,
    /// Optional structured detail for programmatic consumers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
    /// Whether retrying the same input may succeed.
    #[serde(default)]
    pub retryable: bool,
}

impl TaskError {
    /// Creates a new task error with the given code and message.
    pub fn new(code: impl Into<String>, task_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            task_id: task_id.into(),
            detail: None,
            retryable: false,
        }
    }

    /// Creates a `VALIDATION_FAILED` error for a task pre-flight rejection.
    pub fn validation_failed(task_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(codes::VALIDATION_FAILED, task_id, message)
    }

    /// Creates an `EXECUTION_ERROR` for a failure escaping the run loop.
    pub fn execution_error(task_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(codes::EXECUTION_ERROR, task_id, message)
    }

    /// Creates a `TASK_TIMEOUT` error for a task that outran its budget.
    pub fn timeout(task_id: impl Into<String>, millis: u64) -> Self {
        Self::new(
            codes::TASK_TIMEOUT,
            task_id,
            format!("Task timed out after {millis}ms"),
        )
    }

    /// Creates a retryable `429` error with a user-facing rate-limit message.
    pub fn rate_limited(task_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(codes::RATE_LIMITED, task_id, message.into()).retryable(true)
    }

    /// Attaches structured detail to the error.
    pub fn with_detail(mut self, detail: Value) -> Self {
        self.detail = Some(detail);
        self
    }

    /// Sets the retryable flag.
    pub fn retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }
}

impl std::fmt::Display for TaskError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.code, self.task_id, self.message)
    }
}

impl std::error::Error for TaskError {}
