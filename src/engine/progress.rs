//! Observable per-task lifecycle events.
//!
//! The executor emits one [`TaskProgress`] for every state transition of
//! every task. Callers can subscribe through
//! [`PipelineOptions::on_progress`](super::context::PipelineOptions) and
//! receive events in emission order; the full sequence is also returned on
//! the final [`PipelineResult`](super::result::PipelineResult), enough to
//! render a step-by-step execution log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::TaskError;

/// Lifecycle state of a task as observed from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Queued, not yet started.
    Pending,
    /// Currently executing.
    Running,
    /// Settled successfully.
    Completed,
    /// Settled with a failure.
    Failed,
    /// An attempt failed and a retry is pending.
    Retrying,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Running => write!(f, "running"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Failed => write!(f, "failed"),
            TaskStatus::Retrying => write!(f, "retrying"),
        }
    }
}

/// One observable lifecycle event for one task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskProgress {
    /// Id of the task the event concerns.
    pub task_id: String,
    /// Display name of the task.
    pub task_name: String,
    /// Lifecycle state at the time of the event.
    pub status: TaskStatus,
    /// Coarse completion percentage, 0-100.
    pub progress: u8,
    /// When the task started running, if it has.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    /// When the task settled, if it has.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// The first structured error, attached on failure events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<TaskError>,
}

impl TaskProgress {
    /// Creates a `pending` event (progress 0).
    pub fn pending(task_id: impl Into<String>, task_name: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            task_name: task_name.into(),
            status: TaskStatus::Pending,
            progress: 0,
            started_at: None,
            finished_at: None,
            error: None,
        }
    }

    /// Creates a `running` event with a start timestamp.
    pub fn running(task_id: impl Into<String>, task_name: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            task_name: task_name.into(),
            status: TaskStatus::Running,
            progress: 10,
            started_at: Some(Utc::now()),
            finished_at: None,
            error: None,
        }
    }

    /// Creates a `retrying` event after a failed attempt.
    pub fn retrying(
        task_id: impl Into<String>,
        task_name: impl Into<String>,
        attempt: u32,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            task_name: task_name.into(),
            status: TaskStatus::Retrying,
            progress: 10u8.saturating_add((attempt * 10).min(80) as u8),
            started_at: None,
            finished_at: None,
            error: None,
        }
    }

    /// Creates a `completed` event (progress 100).
    pub fn completed(task_id: impl Into<String>, task_name: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            task_name: task_name.into(),
            status: TaskStatus::Completed,
            progress: 100,
            started_at: None,
            finished_at: Some(Utc::now()),
            error: None,
        }
    }

    /// Creates a `failed` event (progress 100) with the first error attached.
    pub fn failed(
        task_id: impl Into<String>,
        task_name: impl Into<String>,
        error: Option<TaskError>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            task_name: task_name.into(),
            status: TaskStatus::Failed,
            progress: 100,
            started_at: None,
            finished_at: Some(Utc::now()),
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_starts_at_zero() {
        let event = TaskProgress::pending("a", "Task A");
        assert_eq!(event.status, TaskStatus::Pending);
        assert_eq!(event.progress, 0);
        assert!(event.started_at.is_none());
    }

    #[test]
    fn test_running_carries_start_timestamp() {
        let event = TaskProgress::running("a", "Task A");
        assert_eq!(event.status, TaskStatus::Running);
        assert!(event.started_at.is_some());
    }

    #[test]
    fn test_terminal_events_at_hundred() {
        let done = TaskProgress::completed("a", "Task A");
        assert_eq!(done.progress, 100);
        assert!(done.finished_at.is_some());

        let err = TaskError::new("X", "a", "boom");
        let failed = TaskProgress::failed("a", "Task A", Some(err.clone()));
        assert_eq!(failed.progress, 100);
        assert_eq!(failed.error, Some(err));
    }

    #[test]
    fn test_retrying_progress_is_bounded() {
        let event = TaskProgress::retrying("a", "Task A", 20);
        assert!(event.progress <= 90);
        assert_eq!(event.status, TaskStatus::Retrying);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(TaskStatus::Retrying.to_string(), "retrying");
        assert_eq!(TaskStatus::Completed.to_string(), "completed");
    }
}
