//! The ingest-source-content pipeline.
//!
//! Six tasks: normalize the raw text, extract structured metadata via the
//! AI endpoint, generate a summary and a title with key phrases, verify the
//! accumulated analysis is complete, and persist the enriched content as a
//! draft record. The three AI-backed tasks carry retry policies so rate
//! limits and transient network faults are retried with backoff.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::engine::error::{codes, TaskError};
use crate::engine::metadata::PipelineMetadata;
use crate::engine::result::TaskResult;
use crate::engine::rules::RuleValue;
use crate::engine::task::{RetryPolicy, Task};
use crate::engine::TaskContext;
use crate::error::LlmError;
use crate::llm::{ResponseShape, TextGenerator};
use crate::store::RecordStore;

/// Store table holding ingested source content.
const SOURCE_CONTENT_TABLE: &str = "source_content";

const METADATA_PROMPT: &str = "Analyze the following text and return a JSON object with these \
fields: \"topics\" (array of strings), \"entities\" (array of strings), \"category\" (string), \
\"language\" (ISO 639-1 code).";

const SUMMARY_PROMPT: &str = "Write a concise summary of the following text. Respond with the \
summary only, no preamble.";

const TITLE_PROMPT: &str = "Return a JSON object with \"title\" (a short descriptive title for \
the following text) and \"key_phrases\" (array of 3-5 notable phrases from it).";

/// Descriptor for the ingest-source-content pipeline.
pub fn metadata() -> PipelineMetadata {
    PipelineMetadata::new(
        "ingest-source-content",
        "Ingest Source Content",
        "Normalize, analyze and persist raw source text",
        "1.0.0",
        vec![
            "normalize-content".into(),
            "extract-metadata".into(),
            "generate-summary".into(),
            "generate-title".into(),
            "completeness-check".into(),
            "persist-content".into(),
        ],
    )
    .with_required(&["source_text"])
    .with_optional("language", RuleValue::Str("en".into()))
    .with_optional("max_summary_length", RuleValue::Num(500.0))
    .with_limit("max_summary_length", 50.0, 2000.0)
}

/// The pipeline's task list, in execution order.
pub fn tasks(
    generator: Arc<dyn TextGenerator>,
    store: Arc<dyn RecordStore>,
) -> Vec<Box<dyn Task>> {
    vec![
        Box::new(NormalizeContentTask),
        Box::new(ExtractMetadataTask { generator: generator.clone() }),
        Box::new(GenerateSummaryTask { generator: generator.clone() }),
        Box::new(GenerateTitleTask { generator }),
        Box::new(CompletenessCheckTask),
        Box::new(PersistContentTask { store }),
    ]
}

/// Retry policy shared by the AI-backed tasks.
fn ai_retry_policy() -> RetryPolicy {
    RetryPolicy::new(2, Duration::from_millis(500))
}

/// Maps a generation failure onto the executor's two failure paths.
///
/// Retryable faults (rate limits, transport errors) surface as `Err` so the
/// executor's retry loop sees them; anything else settles as a failed
/// result with `AI_EXTRACTION_FAILED`.
fn ai_failure(task_id: &str, error: LlmError) -> Result<TaskResult, TaskError> {
    match &error {
        LlmError::RateLimited(message) => Err(TaskError::rate_limited(task_id, message.clone())),
        _ if error.is_retryable() => Err(TaskError::execution_error(task_id, error.to_string())
            .retryable(true)),
        _ => Ok(TaskResult::failed(
            task_id,
            TaskError::new(
                codes::AI_EXTRACTION_FAILED,
                task_id,
                format!("AI analysis failed: {error}"),
            ),
        )),
    }
}

/// The normalized text recorded by normalize-content.
fn normalized_text(ctx: &TaskContext, task_id: &str) -> Result<String, TaskError> {
    ctx.data_for("normalize-content")
        .and_then(|d| d.get("text"))
        .and_then(|t| t.as_str())
        .map(str::to_string)
        .ok_or_else(|| TaskError::execution_error(task_id, "normalize-content data missing"))
}

/// Cleans up whitespace and control characters in the source text.
struct NormalizeContentTask;

/// Collapses runs of spaces and blank lines, strips control characters.
fn normalize(text: &str) -> String {
    let cleaned: String = text
        .replace("\r\n", "\n")
        .chars()
        .filter(|c| !c.is_control() || *c == '\n')
        .collect();

    let mut lines: Vec<String> = Vec::new();
    let mut blank_run = 0usize;
    for line in cleaned.lines() {
        let line = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if line.is_empty() {
            blank_run += 1;
            // At most one blank line between paragraphs.
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        lines.push(line);
    }
    lines.join("\n").trim().to_string()
}

#[async_trait]
impl Task for NormalizeContentTask {
    fn id(&self) -> &str {
        "normalize-content"
    }

    fn name(&self) -> &str {
        "Normalize Content"
    }

    fn description(&self) -> &str {
        "Clean whitespace and control characters from the source text"
    }

    fn validate(&self, ctx: &TaskContext) -> Result<(), String> {
        match ctx.rule_str("source_text") {
            Some(text) if !text.trim().is_empty() => Ok(()),
            _ => Err("Rule 'source_text' must be a non-empty string".to_string()),
        }
    }

    async fn execute(&self, ctx: &TaskContext) -> Result<TaskResult, TaskError> {
        let raw = ctx.rule_str("source_text").unwrap_or_default();
        let text = normalize(raw);
        let word_count = text.split_whitespace().count();
        let char_count = text.chars().count();

        tracing::info!(word_count, char_count, "Normalized source content");

        Ok(TaskResult::ok(
            self.id(),
            json!({
                "text": text,
                "word_count": word_count,
                "char_count": char_count,
            }),
        )
        .with_metadata("word_count", json!(word_count)))
    }
}

/// AI extraction of topics, entities, category and language.
struct ExtractMetadataTask {
    generator: Arc<dyn TextGenerator>,
}

#[async_trait]
impl Task for ExtractMetadataTask {
    fn id(&self) -> &str {
        "extract-metadata"
    }

    fn name(&self) -> &str {
        "Extract Metadata"
    }

    fn description(&self) -> &str {
        "Extract topics, entities and category via the AI endpoint"
    }

    fn retry_policy(&self) -> Option<RetryPolicy> {
        Some(ai_retry_policy())
    }

    async fn execute(&self, ctx: &TaskContext) -> Result<TaskResult, TaskError> {
        let text = normalized_text(ctx, self.id())?;
        let extracted = match self
            .generator
            .generate(METADATA_PROMPT, &text, ResponseShape::Json)
            .await
        {
            Ok(value) => value,
            Err(e) => return ai_failure(self.id(), e),
        };

        if !extracted.is_object() {
            return Ok(TaskResult::failed(
                self.id(),
                TaskError::new(
                    codes::AI_EXTRACTION_FAILED,
                    self.id(),
                    "Metadata extraction did not return a JSON object",
                ),
            ));
        }

        let topics = extracted.get("topics").and_then(|t| t.as_array()).map(|a| a.len());
        tracing::debug!(topics = ?topics, "Extracted content metadata");

        Ok(TaskResult::ok(self.id(), extracted))
    }
}

/// AI-generated summary, truncated to the configured length.
struct GenerateSummaryTask {
    generator: Arc<dyn TextGenerator>,
}

#[async_trait]
impl Task for GenerateSummaryTask {
    fn id(&self) -> &str {
        "generate-summary"
    }

    fn name(&self) -> &str {
        "Generate Summary"
    }

    fn description(&self) -> &str {
        "Generate a summary of the source text"
    }

    fn retry_policy(&self) -> Option<RetryPolicy> {
        Some(ai_retry_policy())
    }

    async fn execute(&self, ctx: &TaskContext) -> Result<TaskResult, TaskError> {
        let text = normalized_text(ctx, self.id())?;
        let max_length = ctx.rule_num("max_summary_length").unwrap_or(500.0) as usize;

        let generated = match self
            .generator
            .generate(SUMMARY_PROMPT, &text, ResponseShape::Text)
            .await
        {
            Ok(value) => value,
            Err(e) => return ai_failure(self.id(), e),
        };

        let summary = generated.as_str().unwrap_or_default().trim().to_string();
        if summary.is_empty() {
            return Ok(TaskResult::failed(
                self.id(),
                TaskError::new(
                    codes::AI_EXTRACTION_FAILED,
                    self.id(),
                    "Summary generation returned empty text",
                ),
            ));
        }

        let mut result = TaskResult::ok(self.id(), Value::Null);
        let summary = if summary.chars().count() > max_length {
            result = result.with_warning(format!(
                "Summary truncated from {} to {} characters",
                summary.chars().count(),
                max_length
            ));
            summary.chars().take(max_length).collect()
        } else {
            summary
        };

        let length = summary.chars().count();
        result.data = Some(json!({"summary": summary, "length": length}));
        Ok(result)
    }
}

/// AI-generated title and key phrases.
struct GenerateTitleTask {
    generator: Arc<dyn TextGenerator>,
}

#[async_trait]
impl Task for GenerateTitleTask {
    fn id(&self) -> &str {
        "generate-title"
    }

    fn name(&self) -> &str {
        "Generate Title"
    }

    fn description(&self) -> &str {
        "Generate a title and key phrases for the source text"
    }

    fn retry_policy(&self) -> Option<RetryPolicy> {
        Some(ai_retry_policy())
    }

    async fn execute(&self, ctx: &TaskContext) -> Result<TaskResult, TaskError> {
        let text = normalized_text(ctx, self.id())?;
        let generated = match self
            .generator
            .generate(TITLE_PROMPT, &text, ResponseShape::Json)
            .await
        {
            Ok(value) => value,
            Err(e) => return ai_failure(self.id(), e),
        };

        let title = generated
            .get("title")
            .and_then(|t| t.as_str())
            .unwrap_or_default()
            .trim()
            .to_string();
        if title.is_empty() {
            return Ok(TaskResult::failed(
                self.id(),
                TaskError::new(
                    codes::AI_EXTRACTION_FAILED,
                    self.id(),
                    "Title generation returned no usable title",
                ),
            ));
        }

        let key_phrases = generated.get("key_phrases").cloned().unwrap_or(json!([]));
        Ok(TaskResult::ok(
            self.id(),
            json!({"title": title, "key_phrases": key_phrases}),
        ))
    }
}

/// Verifies every analysis component is present and non-empty.
struct CompletenessCheckTask;

#[async_trait]
impl Task for CompletenessCheckTask {
    fn id(&self) -> &str {
        "completeness-check"
    }

    fn name(&self) -> &str {
        "Completeness Check"
    }

    fn description(&self) -> &str {
        "Verify the accumulated analysis covers every component"
    }

    fn validate(&self, ctx: &TaskContext) -> Result<(), String> {
        for task_id in ["normalize-content", "extract-metadata", "generate-summary", "generate-title"] {
            if ctx.data_for(task_id).is_none() {
                return Err(format!("No usable result from {task_id}"));
            }
        }
        Ok(())
    }

    async fn execute(&self, ctx: &TaskContext) -> Result<TaskResult, TaskError> {
        // (component name, source task, field that must be non-empty)
        let components = [
            ("text", "normalize-content", "text"),
            ("topics", "extract-metadata", "topics"),
            ("category", "extract-metadata", "category"),
            ("summary", "generate-summary", "summary"),
            ("title", "generate-title", "title"),
        ];

        let mut missing = Vec::new();
        for (component, task_id, field) in components {
            let present = ctx
                .data_for(task_id)
                .and_then(|d| d.get(field))
                .map(|v| match v {
                    Value::String(s) => !s.trim().is_empty(),
                    Value::Array(a) => !a.is_empty(),
                    Value::Null => false,
                    _ => true,
                })
                .unwrap_or(false);
            if !present {
                missing.push(component);
            }
        }

        let coverage = (components.len() - missing.len()) as f64 / components.len() as f64;
        if !missing.is_empty() {
            return Ok(TaskResult::failed(
                self.id(),
                TaskError::validation_failed(
                    self.id(),
                    format!("Analysis incomplete, missing: {}", missing.join(", ")),
                )
                .with_detail(json!({"missing": missing, "coverage": coverage})),
            ));
        }

        Ok(TaskResult::ok(
            self.id(),
            json!({"complete": true, "coverage": coverage}),
        ))
    }
}

/// Inserts the enriched content into the store in draft status.
struct PersistContentTask {
    store: Arc<dyn RecordStore>,
}

#[async_trait]
impl Task for PersistContentTask {
    fn id(&self) -> &str {
        "persist-content"
    }

    fn name(&self) -> &str {
        "Persist Content"
    }

    fn description(&self) -> &str {
        "Insert the enriched source content as a draft record"
    }

    async fn execute(&self, ctx: &TaskContext) -> Result<TaskResult, TaskError> {
        let text = normalized_text(ctx, self.id())?;
        let extracted = ctx
            .data_for("extract-metadata")
            .cloned()
            .unwrap_or(Value::Null);
        let summary = ctx
            .data_for("generate-summary")
            .and_then(|d| d.get("summary"))
            .cloned()
            .unwrap_or(Value::Null);
        let titled = ctx
            .data_for("generate-title")
            .cloned()
            .unwrap_or(Value::Null);
        let language = extracted
            .get("language")
            .and_then(|l| l.as_str())
            .map(str::to_string)
            .or_else(|| ctx.rule_str("language").map(str::to_string))
            .unwrap_or_else(|| "en".to_string());

        let record = json!({
            "text": text,
            "language": language,
            "analysis": extracted,
            "summary": summary,
            "title": titled.get("title").cloned().unwrap_or(Value::Null),
            "key_phrases": titled.get("key_phrases").cloned().unwrap_or(json!([])),
            "status": "draft",
        });

        match self.store.insert_returning(SOURCE_CONTENT_TABLE, record).await {
            Ok(row) => {
                let content_id = row.get("id").cloned().unwrap_or(Value::Null);
                tracing::info!(content_id = %content_id, "Persisted draft source content");
                Ok(TaskResult::ok(self.id(), row).with_metadata("source_content_id", content_id))
            }
            Err(e) => Ok(TaskResult::failed(
                self.id(),
                TaskError::new(
                    codes::DATABASE_ERROR,
                    self.id(),
                    format!("Failed to persist source content: {e}"),
                ),
            )),
        }
    }
}
