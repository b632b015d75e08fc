//! The pipeline run loop and per-task state machine.
//!
//! Runs a fixed, ordered task list once, start to finish, against a single
//! [`TaskContext`]. Tasks execute strictly sequentially; task N never
//! starts before task N-1's result is recorded. Retry, backoff and timeout
//! are enforced here so individual tasks stay policy-free.

use std::time::{Duration, Instant};

use serde_json::Map;

use super::context::{Goal, PipelineOptions, TaskContext};
use super::error::TaskError;
use super::metadata::PipelineMetadata;
use super::progress::TaskProgress;
use super::result::{PipelineResult, PipelineStatus, TaskResult};
use super::task::Task;

/// Executes one pipeline's ordered task list.
pub struct PipelineExecutor {
    metadata: PipelineMetadata,
    tasks: Vec<Box<dyn Task>>,
}

impl PipelineExecutor {
    /// Creates an executor over an ordered task list.
    pub fn new(metadata: PipelineMetadata, tasks: Vec<Box<dyn Task>>) -> Self {
        Self { metadata, tasks }
    }

    /// The pipeline's static descriptor.
    pub fn metadata(&self) -> &PipelineMetadata {
        &self.metadata
    }

    /// Runs every task in order and aggregates one [`PipelineResult`].
    ///
    /// The rule map must already be validated against the metadata. All
    /// failures are reported through the returned result; this function
    /// never short-circuits with an error of its own.
    pub async fn run(
        &self,
        goal: Goal,
        rules: super::rules::Rules,
        options: PipelineOptions,
    ) -> PipelineResult {
        let started = Instant::now();
        let mut ctx = TaskContext::new(goal, rules, options);
        let mut timeline: Vec<TaskProgress> = Vec::new();
        let mut run_error: Option<TaskError> = None;

        tracing::info!(
            pipeline = %self.metadata.id,
            tasks = self.tasks.len(),
            "Starting pipeline run"
        );

        for task in &self.tasks {
            match self.run_task(task.as_ref(), &mut ctx, &mut timeline).await {
                Ok(succeeded) => {
                    if !succeeded && !ctx.options.allow_partial_results {
                        tracing::warn!(
                            pipeline = %self.metadata.id,
                            task = task.id(),
                            "Task failed, halting run"
                        );
                        break;
                    }
                }
                Err(error) => {
                    // A hook or internal failure escaped the loop; the run
                    // aborts with whatever was already recorded.
                    tracing::error!(
                        pipeline = %self.metadata.id,
                        task = task.id(),
                        error = %error,
                        "Execution error escaped the run loop"
                    );
                    run_error = Some(TaskError::execution_error(
                        task.id(),
                        error.to_string(),
                    ));
                    break;
                }
            }
        }

        self.finish(ctx, timeline, run_error, started.elapsed())
    }

    /// Drives one task through its state machine.
    ///
    /// Returns `Ok(true)` if the task settled successfully, `Ok(false)` if
    /// it settled with a failure, and `Err` only when a lifecycle hook
    /// fails, which aborts the whole run.
    async fn run_task(
        &self,
        task: &dyn Task,
        ctx: &mut TaskContext,
        timeline: &mut Vec<TaskProgress>,
    ) -> Result<bool, TaskError> {
        let task_id = task.id().to_string();
        let task_name = task.name().to_string();

        self.emit(ctx, timeline, TaskProgress::pending(&task_id, &task_name));

        if let Err(reason) = task.validate(ctx) {
            let error = TaskError::validation_failed(&task_id, reason);
            tracing::warn!(task = %task_id, error = %error, "Pre-flight validation rejected");
            self.emit(
                ctx,
                timeline,
                TaskProgress::failed(&task_id, &task_name, Some(error.clone())),
            );
            ctx.record(TaskResult::failed(&task_id, error));
            return Ok(false);
        }

        task.on_start(ctx).await?;

        self.emit(ctx, timeline, TaskProgress::running(&task_id, &task_name));

        let result = self.execute_with_policy(task, ctx, timeline).await;

        let settled = match result {
            Ok(result) => result,
            Err(error) => TaskResult::failed(&task_id, error),
        };

        let succeeded = settled.success;
        ctx.record(settled.clone());

        if succeeded {
            task.on_success(&settled).await?;
        } else {
            task.on_error(&settled).await?;
        }
        task.on_complete().await?;

        if succeeded {
            tracing::debug!(task = %task_id, "Task completed");
            self.emit(ctx, timeline, TaskProgress::completed(&task_id, &task_name));
        } else {
            let first = settled.first_error().cloned();
            tracing::warn!(
                task = %task_id,
                error = first.as_ref().map(|e| e.to_string()).unwrap_or_default(),
                "Task failed"
            );
            self.emit(ctx, timeline, TaskProgress::failed(&task_id, &task_name, first));
        }

        Ok(succeeded)
    }

    /// Executes a task under its declared retry or timeout policy.
    async fn execute_with_policy(
        &self,
        task: &dyn Task,
        ctx: &TaskContext,
        timeline: &mut Vec<TaskProgress>,
    ) -> Result<TaskResult, TaskError> {
        if let Some(policy) = task.retry_policy() {
            let mut attempt: u32 = 0;
            loop {
                match task.execute(ctx).await {
                    Ok(result) => return Ok(result),
                    Err(error) if attempt < policy.max_retries => {
                        let delay = policy.backoff(attempt);
                        tracing::debug!(
                            task = task.id(),
                            attempt = attempt + 1,
                            delay_ms = delay.as_millis() as u64,
                            error = %error,
                            "Attempt failed, backing off before retry"
                        );
                        self.emit(
                            ctx,
                            timeline,
                            TaskProgress::retrying(task.id(), task.name(), attempt + 1),
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    Err(error) => return Err(error),
                }
            }
        } else if let Some(limit) = task.timeout() {
            match tokio::time::timeout(limit, task.execute(ctx)).await {
                Ok(result) => result,
                Err(_) => Err(TaskError::timeout(task.id(), limit.as_millis() as u64)),
            }
        } else {
            task.execute(ctx).await
        }
    }

    /// Sends an event to the caller's sink and appends it to the timeline.
    fn emit(&self, ctx: &TaskContext, timeline: &mut Vec<TaskProgress>, event: TaskProgress) {
        if let Some(sink) = &ctx.options.on_progress {
            sink(&event);
        }
        timeline.push(event);
    }

    /// Builds the terminal aggregate from whatever the run recorded.
    fn finish(
        &self,
        ctx: TaskContext,
        timeline: Vec<TaskProgress>,
        run_error: Option<TaskError>,
        elapsed: Duration,
    ) -> PipelineResult {
        let results = ctx.results();
        let any_failed = results.iter().any(|r| !r.success);
        let all_succeeded = !any_failed && results.len() == self.tasks.len();

        let status = if run_error.is_some() {
            PipelineStatus::Error
        } else if all_succeeded {
            PipelineStatus::Success
        } else if any_failed && ctx.options.allow_partial_results {
            PipelineStatus::Partial
        } else {
            PipelineStatus::Error
        };

        let mut errors: Vec<TaskError> = results.iter().flat_map(|r| r.errors.clone()).collect();
        if let Some(error) = run_error {
            errors.push(error);
        }
        let warnings: Vec<String> = results.iter().flat_map(|r| r.warnings.clone()).collect();
        let final_result = ctx.last_result().and_then(|r| r.data.clone());

        tracing::info!(
            pipeline = %self.metadata.id,
            status = %status,
            tasks_settled = results.len(),
            errors = errors.len(),
            warnings = warnings.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Pipeline run finished"
        );

        let mut metadata: Map<String, serde_json::Value> = ctx.metadata.clone();
        metadata.insert(
            "run_id".into(),
            serde_json::Value::String(uuid::Uuid::new_v4().to_string()),
        );

        PipelineResult {
            status,
            pipeline_id: self.metadata.id.clone(),
            pipeline_name: self.metadata.name.clone(),
            task_results: results.to_vec(),
            progress: timeline,
            final_result,
            errors,
            warnings,
            elapsed,
            metadata,
        }
    }
}
