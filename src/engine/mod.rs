//! The process-builder engine: tasks, context, executor and validation.
//!
//! A pipeline is an ordered list of [`Task`]s run once by a
//! [`PipelineExecutor`] against a shared, append-only [`TaskContext`].
//! Static [`PipelineMetadata`] describes each named pipeline's tasks and
//! accepted rules; [`validation`] checks caller input against it before a
//! run starts.

pub mod context;
pub mod error;
pub mod executor;
pub mod metadata;
pub mod progress;
pub mod result;
pub mod rules;
pub mod task;
pub mod validation;

pub use context::{Goal, PipelineOptions, ProgressSink, TaskContext};
pub use error::{codes, TaskError};
pub use executor::PipelineExecutor;
pub use metadata::{NumericLimit, PipelineMetadata, PipelineRegistry};
pub use progress::{TaskProgress, TaskStatus};
pub use result::{PipelineResult, PipelineStatus, TaskResult};
pub use rules::{rules_from, RuleValue, Rules};
pub use task::{RetryPolicy, Task};
pub use validation::{normalize_rules, validate_goal, validate_rules, ValidationError};
