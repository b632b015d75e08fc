//! quizforge: content pipelines for a trivia management system.
//!
//! This library turns raw source text into analyzed, persisted content and
//! builds balanced trivia sets from stored questions, driven by a small
//! task-pipeline engine with retries, timeouts and progress reporting.

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod llm;
pub mod pipelines;
pub mod store;

// Re-export commonly used types
pub use config::{AppConfig, ConfigError};
pub use engine::{
    Goal, PipelineExecutor, PipelineOptions, PipelineResult, PipelineStatus, RuleValue, Task,
    TaskContext, TaskError, TaskResult,
};
pub use error::{LlmError, StoreError};
pub use pipelines::Pipeline;
