//! The contract every pipeline step implements.

use std::time::Duration;

use async_trait::async_trait;

use super::context::TaskContext;
use super::error::TaskError;
use super::result::TaskResult;

/// Local retry policy for a single task.
///
/// The executor retries only failures surfaced as `Err` from
/// [`Task::execute`]; a task that settles with a failed [`TaskResult`] is
/// reporting a domain outcome and is not retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first one.
    pub max_retries: u32,
    /// Base delay; attempt N waits `retry_delay * 2^N`.
    pub retry_delay: Duration,
}

impl RetryPolicy {
    /// Creates a policy with the given retry budget and base delay.
    pub fn new(max_retries: u32, retry_delay: Duration) -> Self {
        Self {
            max_retries,
            retry_delay,
        }
    }

    /// Backoff delay before the attempt following failed attempt `attempt`
    /// (zero-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.retry_delay * 2u32.saturating_pow(attempt)
    }
}

/// One discrete, independently retryable unit of pipeline work.
///
/// Tasks prefer settling with a failed [`TaskResult`] over returning `Err`;
/// the `Err` path exists for transient faults the executor's retry and
/// timeout wrappers should see (network failures, rate limits).
#[async_trait]
pub trait Task: Send + Sync {
    /// Stable identifier, unique within a pipeline.
    fn id(&self) -> &str;

    /// Human-readable display name.
    fn name(&self) -> &str;

    /// One-line description of what the task does.
    fn description(&self) -> &str {
        ""
    }

    /// Retry policy, if this task opts into retries.
    fn retry_policy(&self) -> Option<RetryPolicy> {
        None
    }

    /// Execution timeout, if this task opts into one.
    ///
    /// Expiry marks the task failed; the in-flight future is dropped but no
    /// cancellation signal reaches work already handed to a collaborator.
    fn timeout(&self) -> Option<Duration> {
        None
    }

    /// Pre-flight check against the current context.
    ///
    /// Returning `Err` halts the task without calling [`Task::execute`] and
    /// is terminal for the run.
    fn validate(&self, ctx: &TaskContext) -> Result<(), String> {
        let _ = ctx;
        Ok(())
    }

    /// Performs the task's work against the shared context.
    async fn execute(&self, ctx: &TaskContext) -> Result<TaskResult, TaskError>;

    /// Called before execution begins.
    ///
    /// An `Err` here escapes the run loop and aborts the run with
    /// `EXECUTION_ERROR`.
    async fn on_start(&self, ctx: &TaskContext) -> Result<(), TaskError> {
        let _ = ctx;
        Ok(())
    }

    /// Called after the task settles successfully.
    async fn on_success(&self, result: &TaskResult) -> Result<(), TaskError> {
        let _ = result;
        Ok(())
    }

    /// Called after the task settles with a failure.
    async fn on_error(&self, result: &TaskResult) -> Result<(), TaskError> {
        let _ = result;
        Ok(())
    }

    /// Called after the task settles, regardless of outcome.
    async fn on_complete(&self) -> Result<(), TaskError> {
        Ok(())
    }
}
