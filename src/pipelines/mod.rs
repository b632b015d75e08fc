//! The two content pipelines and their shared entry surface.
//!
//! [`Pipeline`] is the caller-facing wrapper: it validates the goal and
//! rule map against the pipeline's metadata, then hands the run to the
//! executor. The surface is infallible; rejected input comes back as an
//! `Error`-status [`PipelineResult`] rather than an `Err`.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};

use crate::engine::error::TaskError;
use crate::engine::executor::PipelineExecutor;
use crate::engine::metadata::{PipelineMetadata, PipelineRegistry};
use crate::engine::result::{PipelineResult, PipelineStatus};
use crate::engine::validation::{normalize_rules, validate_goal, validate_rules};
use crate::engine::{Goal, PipelineOptions};
use crate::llm::TextGenerator;
use crate::store::RecordStore;

pub mod ingest;
pub mod selection;
pub mod trivia;

pub use selection::{
    DistributionStrategy, QuestionCandidate, QuestionSelectionResult, QuestionType,
};

/// A named pipeline ready to execute.
pub struct Pipeline {
    executor: PipelineExecutor,
}

impl Pipeline {
    /// The build-trivia-set pipeline over the given store.
    pub fn build_trivia_set(store: Arc<dyn RecordStore>) -> Self {
        Self {
            executor: PipelineExecutor::new(trivia::metadata(), trivia::tasks(store)),
        }
    }

    /// The ingest-source-content pipeline over the given collaborators.
    pub fn ingest_source_content(
        generator: Arc<dyn TextGenerator>,
        store: Arc<dyn RecordStore>,
    ) -> Self {
        Self {
            executor: PipelineExecutor::new(
                ingest::metadata(),
                ingest::tasks(generator, store),
            ),
        }
    }

    /// The pipeline's static descriptor.
    pub fn metadata(&self) -> &PipelineMetadata {
        self.executor.metadata()
    }

    /// Validates the caller's input and runs the pipeline.
    ///
    /// Goal or rule rejection yields an `Error`-status result carrying one
    /// `VALIDATION_FAILED` error per violation; no task runs in that case.
    pub async fn execute(
        &self,
        goal: Goal,
        raw_rules: Map<String, Value>,
        options: PipelineOptions,
    ) -> PipelineResult {
        let metadata = self.executor.metadata();

        let mut violations: Vec<String> = Vec::new();
        if let Err(e) = validate_goal(&goal) {
            violations.push(e.to_string());
        }

        let rules = match validate_rules(normalize_rules(raw_rules), metadata) {
            Ok(rules) => Some(rules),
            Err(errors) => {
                violations.extend(errors.iter().map(|e| e.to_string()));
                None
            }
        };

        if !violations.is_empty() {
            tracing::warn!(
                pipeline = %metadata.id,
                violations = violations.len(),
                "Rejected pipeline input"
            );
            return self.rejection(violations);
        }

        self.executor.run(goal, rules.unwrap_or_default(), options).await
    }

    /// An `Error`-status result describing rejected input.
    fn rejection(&self, violations: Vec<String>) -> PipelineResult {
        let metadata = self.executor.metadata();
        PipelineResult {
            status: PipelineStatus::Error,
            pipeline_id: metadata.id.clone(),
            pipeline_name: metadata.name.clone(),
            task_results: Vec::new(),
            progress: Vec::new(),
            final_result: None,
            errors: violations
                .into_iter()
                .map(|v| TaskError::validation_failed(&metadata.id, v))
                .collect(),
            warnings: Vec::new(),
            elapsed: Duration::ZERO,
            metadata: Map::new(),
        }
    }
}

/// Registry holding every pipeline descriptor this crate ships.
pub fn registry() -> PipelineRegistry {
    let mut registry = PipelineRegistry::new();
    registry.register(ingest::metadata());
    registry.register(trivia::metadata());
    registry
}
