//! Per-run execution context threaded through a pipeline.
//!
//! One [`TaskContext`] is owned by exactly one executor run. Tasks read
//! prior results out of it by task id and the executor appends each new
//! result as it settles, so task N always sees tasks 0..N-1 settled.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::progress::TaskProgress;
use super::result::TaskResult;
use super::rules::Rules;

/// The caller's intent: free text plus an open metadata bag.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Goal {
    /// Free-text description of what the caller wants.
    pub text: String,
    /// Open metadata supplied alongside the text.
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Goal {
    /// Creates a goal from free text.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: Map::new(),
        }
    }

    /// Attaches a metadata entry to the goal.
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// Caller-supplied progress sink, invoked for every emitted event in order.
pub type ProgressSink = Arc<dyn Fn(&TaskProgress) + Send + Sync>;

/// Execution options recognized by every pipeline.
#[derive(Clone, Default)]
pub struct PipelineOptions {
    /// Continue past a failed task and report a `Partial` result.
    pub allow_partial_results: bool,
    /// Reserved: current tasks do not consult the cache flag.
    pub use_cache: bool,
    /// Reserved: accepted but not wired into any current task.
    pub dry_run: bool,
    /// Optional sink receiving every progress event as it is emitted.
    pub on_progress: Option<ProgressSink>,
}

impl std::fmt::Debug for PipelineOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineOptions")
            .field("allow_partial_results", &self.allow_partial_results)
            .field("use_cache", &self.use_cache)
            .field("dry_run", &self.dry_run)
            .field("on_progress", &self.on_progress.is_some())
            .finish()
    }
}

impl PipelineOptions {
    /// Creates default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opts into partial results on task failure.
    pub fn with_partial_results(mut self, allow: bool) -> Self {
        self.allow_partial_results = allow;
        self
    }

    /// Sets the progress sink.
    pub fn with_progress_sink(mut self, sink: ProgressSink) -> Self {
        self.on_progress = Some(sink);
        self
    }
}

/// Mutable-by-append state threaded through one pipeline run.
#[derive(Debug)]
pub struct TaskContext {
    /// The validated goal driving the run.
    pub goal: Goal,
    /// The validated, normalized rule map.
    pub rules: Rules,
    /// Caller options for this run.
    pub options: PipelineOptions,
    /// Metadata merged from every settled task result.
    pub metadata: Map<String, Value>,
    results: Vec<TaskResult>,
    by_task: HashMap<String, usize>,
}

impl TaskContext {
    /// Creates a fresh context for one run.
    pub fn new(goal: Goal, rules: Rules, options: PipelineOptions) -> Self {
        Self {
            goal,
            rules,
            options,
            metadata: Map::new(),
            results: Vec::new(),
            by_task: HashMap::new(),
        }
    }

    /// Appends a settled task result and merges its metadata.
    ///
    /// Exactly one entry is recorded per task the executor settles,
    /// regardless of how many retry attempts it took.
    pub fn record(&mut self, result: TaskResult) {
        for (key, value) in &result.metadata {
            self.metadata.insert(key.clone(), value.clone());
        }
        self.by_task.insert(result.task_id.clone(), self.results.len());
        self.results.push(result);
    }

    /// Looks up a prior task's result by task id.
    pub fn result_for(&self, task_id: &str) -> Option<&TaskResult> {
        self.by_task.get(task_id).map(|&i| &self.results[i])
    }

    /// The data payload of a prior task, if it settled successfully.
    pub fn data_for(&self, task_id: &str) -> Option<&Value> {
        self.result_for(task_id)
            .filter(|r| r.success)
            .and_then(|r| r.data.as_ref())
    }

    /// All settled results, in execution order.
    pub fn results(&self) -> &[TaskResult] {
        &self.results
    }

    /// The most recently settled result.
    pub fn last_result(&self) -> Option<&TaskResult> {
        self.results.last()
    }

    /// String payload of a rule, if present and string-typed.
    pub fn rule_str(&self, name: &str) -> Option<&str> {
        self.rules.get(name).and_then(|r| r.as_str())
    }

    /// Numeric payload of a rule, if present and numeric.
    pub fn rule_num(&self, name: &str) -> Option<f64> {
        self.rules.get(name).and_then(|r| r.as_num())
    }

    /// Boolean payload of a rule, if present and boolean.
    pub fn rule_bool(&self, name: &str) -> Option<bool> {
        self.rules.get(name).and_then(|r| r.as_bool())
    }
}
