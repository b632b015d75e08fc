//! The build-trivia-set pipeline.
//!
//! Six tasks: query candidate questions from the store, select and balance
//! a subset, derive set metadata, assemble the persistable payload, insert
//! the set as a draft, and run structural finalization checks. Records stay
//! in `draft` status until finalization succeeds; there is no cross-task
//! transaction.

use std::sync::Arc;

use async_trait::async_trait;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use regex::Regex;
use serde_json::{json, Value};

use crate::engine::error::{codes, TaskError};
use crate::engine::metadata::PipelineMetadata;
use crate::engine::result::TaskResult;
use crate::engine::rules::RuleValue;
use crate::engine::task::Task;
use crate::engine::TaskContext;
use crate::store::{Filters, RecordStore};

use super::selection::{
    select_questions, DistributionStrategy, QuestionCandidate, QuestionSelectionResult,
    QuestionType, SelectionConfig, SelectionError,
};

/// Store table holding candidate questions.
const QUESTIONS_TABLE: &str = "questions";
/// Store table holding assembled trivia sets.
const TRIVIA_SETS_TABLE: &str = "trivia_sets";

/// Descriptor for the build-trivia-set pipeline.
pub fn metadata() -> PipelineMetadata {
    PipelineMetadata::new(
        "build-trivia-set",
        "Build Trivia Set",
        "Select, balance and persist a trivia set for a theme",
        "1.0.0",
        vec![
            "query-questions".into(),
            "select-questions".into(),
            "set-metadata".into(),
            "assemble-payload".into(),
            "persist-set".into(),
            "finalize-set".into(),
        ],
    )
    .with_required(&["theme"])
    .with_optional("count", RuleValue::Num(10.0))
    .with_optional(
        "question_types",
        RuleValue::Array(
            QuestionType::all()
                .iter()
                .map(|t| Value::String(t.as_str().to_string()))
                .collect(),
        ),
    )
    .with_optional("distribution", RuleValue::Str("weighted".into()))
    .with_optional("allow_partial_sets", RuleValue::Bool(false))
    .with_limit("count", 1.0, 50.0)
}

/// The pipeline's task list, in execution order.
pub fn tasks(store: Arc<dyn RecordStore>) -> Vec<Box<dyn Task>> {
    vec![
        Box::new(QueryQuestionsTask { store: store.clone() }),
        Box::new(SelectQuestionsTask),
        Box::new(SetMetadataTask),
        Box::new(AssemblePayloadTask),
        Box::new(PersistSetTask { store }),
        Box::new(FinalizeSetTask),
    ]
}

/// Optional reproducibility seed shared by the randomized tasks.
fn seed_from(ctx: &TaskContext) -> Option<u64> {
    ctx.rule_num("seed").map(|n| n as u64)
}

/// Question types the caller asked for, in priority order.
fn requested_types(ctx: &TaskContext) -> Vec<QuestionType> {
    let requested: Vec<QuestionType> = ctx
        .rules
        .get("question_types")
        .and_then(|r| r.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str())
                .filter_map(QuestionType::parse)
                .collect()
        })
        .unwrap_or_default();
    if requested.is_empty() {
        QuestionType::all().to_vec()
    } else {
        requested
    }
}

/// Parses a store row into a candidate, skipping malformed rows.
fn candidate_from_row(row: &Value) -> Option<QuestionCandidate> {
    let question_type = QuestionType::parse(row.get("type")?.as_str()?)?;
    Some(QuestionCandidate {
        id: row.get("id")?.as_str()?.to_string(),
        question: row.get("question")?.as_str()?.to_string(),
        question_type,
        correct_answer: row.get("correct_answer")?.as_str()?.to_string(),
        wrong_answers: row
            .get("wrong_answers")
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default(),
        theme: row.get("theme").and_then(|v| v.as_str()).map(str::to_string),
        tags: row
            .get("tags")
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default(),
        difficulty: row
            .get("difficulty")
            .and_then(|v| v.as_str())
            .map(str::to_string),
        collection_id: row
            .get("collection_id")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
    })
}

/// Fetches candidate questions for the requested theme and types.
struct QueryQuestionsTask {
    store: Arc<dyn RecordStore>,
}

#[async_trait]
impl Task for QueryQuestionsTask {
    fn id(&self) -> &str {
        "query-questions"
    }

    fn name(&self) -> &str {
        "Query Questions"
    }

    fn description(&self) -> &str {
        "Fetch candidate questions for the requested theme"
    }

    async fn execute(&self, ctx: &TaskContext) -> Result<TaskResult, TaskError> {
        let theme = ctx.rule_str("theme").unwrap_or_default().trim().to_string();
        if theme.is_empty() {
            return Ok(TaskResult::failed(
                self.id(),
                TaskError::new(
                    codes::MISSING_THEME,
                    self.id(),
                    "Cannot build a trivia set without a theme",
                ),
            ));
        }

        let mut filters = Filters::new();
        filters.insert("theme".to_string(), Value::String(theme.clone()));

        let rows = match self.store.select_filtered(QUESTIONS_TABLE, &filters).await {
            Ok(rows) => rows,
            Err(e) => {
                return Ok(TaskResult::failed(
                    self.id(),
                    TaskError::new(
                        codes::DATABASE_ERROR,
                        self.id(),
                        format!("Question query failed: {e}"),
                    ),
                ));
            }
        };

        let types = requested_types(ctx);
        let mut skipped = 0usize;
        let candidates: Vec<QuestionCandidate> = rows
            .iter()
            .filter_map(|row| match candidate_from_row(row) {
                Some(c) => Some(c),
                None => {
                    skipped += 1;
                    None
                }
            })
            .filter(|c| types.contains(&c.question_type))
            .collect();

        tracing::info!(
            theme = %theme,
            fetched = rows.len(),
            usable = candidates.len(),
            skipped,
            "Queried candidate questions"
        );

        let count = candidates.len();
        let mut result = TaskResult::ok(
            self.id(),
            json!({"theme": theme, "candidates": candidates}),
        )
        .with_metadata("candidate_count", json!(count));
        if skipped > 0 {
            result = result.with_warning(format!("Skipped {skipped} malformed question rows"));
        }
        Ok(result)
    }
}

/// Runs the selection and balancing algorithm over the candidate pool.
struct SelectQuestionsTask;

#[async_trait]
impl Task for SelectQuestionsTask {
    fn id(&self) -> &str {
        "select-questions"
    }

    fn name(&self) -> &str {
        "Select Questions"
    }

    fn description(&self) -> &str {
        "Select a balanced, diverse subset of the candidate pool"
    }

    fn validate(&self, ctx: &TaskContext) -> Result<(), String> {
        if ctx.data_for("query-questions").is_none() {
            return Err("No candidate questions available from query-questions".to_string());
        }
        Ok(())
    }

    async fn execute(&self, ctx: &TaskContext) -> Result<TaskResult, TaskError> {
        let data = ctx
            .data_for("query-questions")
            .ok_or_else(|| TaskError::execution_error(self.id(), "query-questions data missing"))?;
        let pool: Vec<QuestionCandidate> =
            serde_json::from_value(data["candidates"].clone()).map_err(|e| {
                TaskError::execution_error(self.id(), format!("Malformed candidate pool: {e}"))
            })?;

        let total = ctx.rule_num("count").unwrap_or(10.0) as usize;
        let strategy = ctx
            .rule_str("distribution")
            .and_then(DistributionStrategy::parse)
            .unwrap_or(DistributionStrategy::Weighted);
        let allow_partial = ctx.rule_bool("allow_partial_sets").unwrap_or(false);

        let config = SelectionConfig {
            total,
            strategy,
            allow_partial,
            seed: seed_from(ctx),
        };

        let selection = match select_questions(&pool, &config) {
            Ok(selection) => selection,
            Err(SelectionError::InsufficientQuestions { requested, available }) => {
                return Ok(TaskResult::failed(
                    self.id(),
                    TaskError::new(
                        codes::INSUFFICIENT_QUESTIONS,
                        self.id(),
                        format!("Insufficient questions: need {requested}, have {available}"),
                    )
                    .with_detail(json!({"requested": requested, "available": available})),
                ));
            }
        };

        let warnings = selection.warnings.clone();
        let selected = selection.selected.len();
        let mut result = TaskResult::ok(
            self.id(),
            serde_json::to_value(&selection).map_err(|e| {
                TaskError::execution_error(self.id(), format!("Selection not serializable: {e}"))
            })?,
        )
        .with_metadata("selected_count", json!(selected));
        for warning in warnings {
            result = result.with_warning(warning);
        }
        Ok(result)
    }
}

/// Derives the deterministic title, slug and description for the set.
struct SetMetadataTask;

#[async_trait]
impl Task for SetMetadataTask {
    fn id(&self) -> &str {
        "set-metadata"
    }

    fn name(&self) -> &str {
        "Set Metadata"
    }

    fn description(&self) -> &str {
        "Derive title, slug and description for the trivia set"
    }

    async fn execute(&self, ctx: &TaskContext) -> Result<TaskResult, TaskError> {
        let selection = selection_from(ctx, self.id())?;
        if selection.selected.is_empty() {
            return Ok(TaskResult::failed(
                self.id(),
                TaskError::new(
                    codes::NO_SELECTED_QUESTIONS,
                    self.id(),
                    "Selection produced no questions to build a set from",
                ),
            ));
        }

        let theme = ctx.rule_str("theme").unwrap_or("general").trim().to_string();
        let title = format!("{} Trivia", title_case(&theme));
        let slug = slugify(&title);
        let average = average_difficulty(&selection.selected);
        let description = format!(
            "A {}-question trivia set about {} (average difficulty {:.1}/3)",
            selection.selected.len(),
            theme,
            average
        );

        Ok(TaskResult::ok(
            self.id(),
            json!({
                "title": title,
                "slug": slug,
                "description": description,
                "average_difficulty": average,
                "question_count": selection.selected.len(),
            }),
        ))
    }
}

/// Assembles the persistable set payload from selection and metadata.
struct AssemblePayloadTask;

#[async_trait]
impl Task for AssemblePayloadTask {
    fn id(&self) -> &str {
        "assemble-payload"
    }

    fn name(&self) -> &str {
        "Assemble Payload"
    }

    fn description(&self) -> &str {
        "Build the store payload with scored, shuffled questions"
    }

    async fn execute(&self, ctx: &TaskContext) -> Result<TaskResult, TaskError> {
        let selection = selection_from(ctx, self.id())?;
        let meta = ctx
            .data_for("set-metadata")
            .cloned()
            .ok_or_else(|| TaskError::execution_error(self.id(), "set-metadata data missing"))?;

        let mut rng = match seed_from(ctx) {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_rng(&mut rand::rng()),
        };

        let questions: Vec<Value> = selection
            .selected
            .iter()
            .map(|candidate| {
                let level = difficulty_level(candidate.difficulty.as_deref());
                let mut wrong = candidate.wrong_answers.clone();
                wrong.shuffle(&mut rng);
                json!({
                    "question_id": candidate.id,
                    "question": candidate.question,
                    "type": candidate.question_type.as_str(),
                    "correct_answer": candidate.correct_answer,
                    "wrong_answers": wrong,
                    "difficulty": level,
                    "points": level * 10,
                })
            })
            .collect();

        Ok(TaskResult::ok(
            self.id(),
            json!({
                "title": meta["title"],
                "slug": meta["slug"],
                "description": meta["description"],
                "average_difficulty": meta["average_difficulty"],
                "question_count": questions.len(),
                "questions": questions,
            }),
        ))
    }
}

/// Inserts the assembled set into the store in draft status.
struct PersistSetTask {
    store: Arc<dyn RecordStore>,
}

#[async_trait]
impl Task for PersistSetTask {
    fn id(&self) -> &str {
        "persist-set"
    }

    fn name(&self) -> &str {
        "Persist Set"
    }

    fn description(&self) -> &str {
        "Insert the trivia set as a draft record"
    }

    async fn execute(&self, ctx: &TaskContext) -> Result<TaskResult, TaskError> {
        let mut payload = ctx
            .data_for("assemble-payload")
            .cloned()
            .ok_or_else(|| TaskError::execution_error(self.id(), "assemble-payload data missing"))?;

        if let Some(map) = payload.as_object_mut() {
            // Draft until finalize-set confirms the set is structurally sound.
            map.insert("status".to_string(), json!("draft"));
        }

        match self.store.insert_returning(TRIVIA_SETS_TABLE, payload).await {
            Ok(row) => {
                let set_id = row.get("id").cloned().unwrap_or(Value::Null);
                tracing::info!(set_id = %set_id, "Persisted draft trivia set");
                Ok(TaskResult::ok(self.id(), row).with_metadata("trivia_set_id", set_id))
            }
            Err(e) => Ok(TaskResult::failed(
                self.id(),
                TaskError::new(
                    codes::DATABASE_ERROR,
                    self.id(),
                    format!("Failed to persist trivia set: {e}"),
                ),
            )),
        }
    }
}

/// Structural finalization checks over the persisted set.
struct FinalizeSetTask;

#[async_trait]
impl Task for FinalizeSetTask {
    fn id(&self) -> &str {
        "finalize-set"
    }

    fn name(&self) -> &str {
        "Finalize Set"
    }

    fn description(&self) -> &str {
        "Verify the persisted set is structurally sound"
    }

    async fn execute(&self, ctx: &TaskContext) -> Result<TaskResult, TaskError> {
        let set = ctx
            .data_for("persist-set")
            .cloned()
            .ok_or_else(|| TaskError::execution_error(self.id(), "persist-set data missing"))?;

        let mut problems = Vec::new();
        let mut warnings = Vec::new();

        for field in ["title", "slug", "questions"] {
            if set.get(field).is_none() {
                problems.push(format!("Missing required field '{field}'"));
            }
        }

        let questions = set
            .get("questions")
            .and_then(|q| q.as_array())
            .cloned()
            .unwrap_or_default();
        if questions.is_empty() {
            problems.push("Set contains no questions".to_string());
        }

        let mut seen_text: Vec<String> = Vec::new();
        for (i, question) in questions.iter().enumerate() {
            let text = question
                .get("question")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_lowercase();
            if !text.is_empty() && seen_text.contains(&text) {
                warnings.push(format!("Duplicate question text at position {i}"));
            }
            seen_text.push(text);

            let correct = question
                .get("correct_answer")
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            let qtype = question.get("type").and_then(|v| v.as_str()).unwrap_or_default();
            let wrong: Vec<&str> = question
                .get("wrong_answers")
                .and_then(|v| v.as_array())
                .map(|items| items.iter().filter_map(|v| v.as_str()).collect())
                .unwrap_or_default();

            match qtype {
                "multiple_choice" => {
                    if wrong.len() < 2 {
                        problems.push(format!(
                            "Question {i} needs at least 2 wrong answers, has {}",
                            wrong.len()
                        ));
                    }
                    if wrong.contains(&correct) {
                        problems.push(format!("Question {i} lists its correct answer as wrong"));
                    }
                    let mut unique = wrong.clone();
                    unique.sort_unstable();
                    unique.dedup();
                    if unique.len() != wrong.len() {
                        problems.push(format!("Question {i} has duplicate wrong answers"));
                    }
                }
                "true_false" => {
                    if !matches!(correct.to_lowercase().as_str(), "true" | "false") {
                        problems.push(format!(
                            "Question {i} is true/false but the answer is '{correct}'"
                        ));
                    }
                }
                _ => {}
            }
            if correct.is_empty() {
                problems.push(format!("Question {i} has no correct answer"));
            }
        }

        if !problems.is_empty() {
            return Ok(TaskResult::failed(
                self.id(),
                TaskError::validation_failed(
                    self.id(),
                    format!("Set failed finalization: {}", problems.join("; ")),
                )
                .with_detail(json!({"problems": problems})),
            ));
        }

        let mut result = TaskResult::ok(
            self.id(),
            json!({
                "finalized": true,
                "trivia_set_id": set.get("id").cloned().unwrap_or(Value::Null),
                "question_count": questions.len(),
            }),
        );
        for warning in warnings {
            result = result.with_warning(warning);
        }
        Ok(result)
    }
}

/// Deserializes the selection result recorded by select-questions.
fn selection_from(ctx: &TaskContext, task_id: &str) -> Result<QuestionSelectionResult, TaskError> {
    let data = ctx
        .data_for("select-questions")
        .ok_or_else(|| TaskError::execution_error(task_id, "select-questions data missing"))?;
    serde_json::from_value(data.clone())
        .map_err(|e| TaskError::execution_error(task_id, format!("Malformed selection data: {e}")))
}

/// Maps a declared difficulty onto the 1-3 scoring scale (unknown = 2).
fn difficulty_level(difficulty: Option<&str>) -> u32 {
    match super::selection::normalize_difficulty(difficulty) {
        "easy" => 1,
        "hard" => 3,
        _ => 2,
    }
}

/// Mean difficulty level across the selected questions.
fn average_difficulty(selected: &[QuestionCandidate]) -> f64 {
    if selected.is_empty() {
        return 0.0;
    }
    let sum: u32 = selected
        .iter()
        .map(|c| difficulty_level(c.difficulty.as_deref()))
        .sum();
    f64::from(sum) / selected.len() as f64
}

/// Uppercases the first letter of each whitespace-separated word.
fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// URL-safe slug: lowercase alphanumerics joined by single hyphens.
fn slugify(text: &str) -> String {
    let separators = Regex::new(r"[^a-z0-9]+").map(|re| {
        re.replace_all(&text.to_lowercase(), "-").into_owned()
    });
    match separators {
        Ok(slug) => slug.trim_matches('-').to_string(),
        Err(_) => text.to_lowercase().replace(' ', "-"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::context::{Goal, PipelineOptions};
    use crate::engine::rules::rules_from;
    use crate::store::MemoryStore;

    fn question_row(id: &str, theme: &str, qtype: &str, difficulty: &str) -> Value {
        let (correct, wrong) = if qtype == "true_false" {
            ("true", json!([]))
        } else {
            ("alpha", json!(["beta", "gamma", "delta"]))
        };
        json!({
            "id": id,
            "question": format!("Question {id}?"),
            "type": qtype,
            "correct_answer": correct,
            "wrong_answers": wrong,
            "theme": theme,
            "tags": ["t1"],
            "difficulty": difficulty,
            "collection_id": "col-1",
        })
    }

    fn context(rules: crate::engine::rules::Rules) -> TaskContext {
        TaskContext::new(
            Goal::new("Build a space trivia set"),
            rules,
            PipelineOptions::default(),
        )
    }

    async fn seeded_store(count: usize) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        let difficulties = ["easy", "medium", "hard"];
        let rows: Vec<Value> = (0..count)
            .map(|i| {
                question_row(
                    &format!("q-{i}"),
                    "space",
                    if i % 2 == 0 { "multiple_choice" } else { "true_false" },
                    difficulties[i % 3],
                )
            })
            .collect();
        store.seed(QUESTIONS_TABLE, rows).await;
        store
    }

    #[tokio::test]
    async fn test_query_questions_filters_by_theme() {
        let store = seeded_store(6).await;
        store
            .seed("other", vec![question_row("x", "history", "true_false", "easy")])
            .await;

        let ctx = context(rules_from([("theme", RuleValue::from("space"))]));
        let task = QueryQuestionsTask { store };
        let result = task.execute(&ctx).await.expect("executes");
        assert!(result.success);
        let data = result.data.expect("data");
        assert_eq!(data["candidates"].as_array().map(|a| a.len()), Some(6));
        assert_eq!(result.metadata["candidate_count"], 6);
    }

    #[tokio::test]
    async fn test_query_questions_empty_theme_fails() {
        let store = seeded_store(3).await;
        let ctx = context(rules_from([("theme", RuleValue::from("  "))]));
        let task = QueryQuestionsTask { store };
        let result = task.execute(&ctx).await.expect("executes");
        assert!(!result.success);
        assert_eq!(result.first_error().map(|e| e.code.as_str()), Some(codes::MISSING_THEME));
    }

    #[tokio::test]
    async fn test_query_questions_honors_type_filter() {
        let store = seeded_store(6).await;
        let ctx = context(rules_from([
            ("theme", RuleValue::from("space")),
            (
                "question_types",
                RuleValue::Array(vec![json!("true_false")]),
            ),
        ]));
        let task = QueryQuestionsTask { store };
        let result = task.execute(&ctx).await.expect("executes");
        let data = result.data.expect("data");
        let candidates = data["candidates"].as_array().expect("array");
        assert!(candidates.iter().all(|c| c["question_type"] == "true_false"));
    }

    #[tokio::test]
    async fn test_select_questions_insufficient_pool() {
        let store = seeded_store(2).await;
        let mut ctx = context(rules_from([
            ("theme", RuleValue::from("space")),
            ("count", RuleValue::from(10i64)),
        ]));
        let query = QueryQuestionsTask { store };
        ctx.record(query.execute(&ctx).await.expect("query"));

        let result = SelectQuestionsTask.execute(&ctx).await.expect("executes");
        assert!(!result.success);
        let error = result.first_error().expect("error");
        assert_eq!(error.code, codes::INSUFFICIENT_QUESTIONS);
        assert!(error.message.contains("need 10, have 2"));
        assert_eq!(error.detail.as_ref().map(|d| d["available"].clone()), Some(json!(2)));
    }

    #[tokio::test]
    async fn test_select_questions_validate_requires_query() {
        let ctx = context(rules_from([("theme", RuleValue::from("space"))]));
        assert!(SelectQuestionsTask.validate(&ctx).is_err());
    }

    #[tokio::test]
    async fn test_set_metadata_derives_title_and_slug() {
        let store = seeded_store(12).await;
        let mut ctx = context(rules_from([
            ("theme", RuleValue::from("solar system")),
            ("count", RuleValue::from(6i64)),
            ("seed", RuleValue::from(7i64)),
        ]));
        // The store is seeded under "space"; reuse the rows under the new theme.
        let rows: Vec<Value> = (0..12)
            .map(|i| question_row(&format!("q-{i}"), "solar system", "multiple_choice", "medium"))
            .collect();
        store.seed(QUESTIONS_TABLE, rows).await;

        let query = QueryQuestionsTask { store };
        ctx.record(query.execute(&ctx).await.expect("query"));
        ctx.record(SelectQuestionsTask.execute(&ctx).await.expect("select"));

        let result = SetMetadataTask.execute(&ctx).await.expect("executes");
        assert!(result.success);
        let data = result.data.expect("data");
        assert_eq!(data["title"], "Solar System Trivia");
        assert_eq!(data["slug"], "solar-system-trivia");
        assert_eq!(data["question_count"], 6);
        assert!((data["average_difficulty"].as_f64().unwrap() - 2.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_full_assembly_and_finalization() {
        let store = seeded_store(12).await;
        let mut ctx = context(rules_from([
            ("theme", RuleValue::from("space")),
            ("count", RuleValue::from(8i64)),
            ("seed", RuleValue::from(11i64)),
        ]));

        let query = QueryQuestionsTask { store: store.clone() };
        ctx.record(query.execute(&ctx).await.expect("query"));
        ctx.record(SelectQuestionsTask.execute(&ctx).await.expect("select"));
        ctx.record(SetMetadataTask.execute(&ctx).await.expect("metadata"));

        let assembled = AssemblePayloadTask.execute(&ctx).await.expect("assemble");
        assert!(assembled.success);
        let payload = assembled.data.clone().expect("payload");
        let questions = payload["questions"].as_array().expect("questions");
        assert_eq!(questions.len(), 8);
        for q in questions {
            let level = q["difficulty"].as_u64().expect("level");
            assert!((1..=3).contains(&level));
            assert_eq!(q["points"].as_u64(), Some(level * 10));
        }
        ctx.record(assembled);

        let persist = PersistSetTask { store: store.clone() };
        let persisted = persist.execute(&ctx).await.expect("persist");
        assert!(persisted.success);
        let row = persisted.data.clone().expect("row");
        assert_eq!(row["status"], "draft");
        assert!(row["id"].is_string());
        assert_eq!(store.count(TRIVIA_SETS_TABLE).await, 1);
        ctx.record(persisted);

        let finalized = FinalizeSetTask.execute(&ctx).await.expect("finalize");
        assert!(finalized.success, "errors: {:?}", finalized.errors);
        let data = finalized.data.expect("data");
        assert_eq!(data["finalized"], true);
        assert_eq!(data["question_count"], 8);
    }

    #[tokio::test]
    async fn test_finalize_rejects_missing_wrong_answers() {
        let mut ctx = context(rules_from([("theme", RuleValue::from("space"))]));
        ctx.record(TaskResult::ok(
            "persist-set",
            json!({
                "id": "set-1",
                "title": "Space Trivia",
                "slug": "space-trivia",
                "questions": [{
                    "question": "Largest planet?",
                    "type": "multiple_choice",
                    "correct_answer": "Jupiter",
                    "wrong_answers": ["Mars"],
                }],
            }),
        ));

        let result = FinalizeSetTask.execute(&ctx).await.expect("executes");
        assert!(!result.success);
        let error = result.first_error().expect("error");
        assert_eq!(error.code, codes::VALIDATION_FAILED);
        assert!(error.message.contains("at least 2 wrong answers"));
    }

    #[tokio::test]
    async fn test_finalize_warns_on_duplicate_question_text() {
        let mut ctx = context(rules_from([("theme", RuleValue::from("space"))]));
        let question = json!({
            "question": "Is Mars red?",
            "type": "true_false",
            "correct_answer": "true",
            "wrong_answers": [],
        });
        ctx.record(TaskResult::ok(
            "persist-set",
            json!({
                "id": "set-2",
                "title": "Space Trivia",
                "slug": "space-trivia",
                "questions": [question.clone(), question],
            }),
        ));

        let result = FinalizeSetTask.execute(&ctx).await.expect("executes");
        assert!(result.success);
        assert!(result.warnings.iter().any(|w| w.contains("Duplicate question text")));
    }

    #[tokio::test]
    async fn test_finalize_rejects_non_boolean_true_false() {
        let mut ctx = context(rules_from([("theme", RuleValue::from("space"))]));
        ctx.record(TaskResult::ok(
            "persist-set",
            json!({
                "id": "set-3",
                "title": "Space Trivia",
                "slug": "space-trivia",
                "questions": [{
                    "question": "Is Mars red?",
                    "type": "true_false",
                    "correct_answer": "reddish",
                    "wrong_answers": [],
                }],
            }),
        ));

        let result = FinalizeSetTask.execute(&ctx).await.expect("executes");
        assert!(!result.success);
    }

    #[test]
    fn test_metadata_descriptor() {
        let meta = metadata();
        assert_eq!(meta.id, "build-trivia-set");
        assert_eq!(meta.task_ids.len(), 6);
        assert_eq!(meta.required_rules, vec!["theme"]);
        assert_eq!(meta.defaults["count"], RuleValue::Num(10.0));
        assert!(meta.limits["count"].contains(50.0));
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Solar System Trivia"), "solar-system-trivia");
        assert_eq!(slugify("  WWII -- Europe!  "), "wwii-europe");
    }

    #[test]
    fn test_difficulty_level_mapping() {
        assert_eq!(difficulty_level(Some("easy")), 1);
        assert_eq!(difficulty_level(Some("medium")), 2);
        assert_eq!(difficulty_level(Some("hard")), 3);
        assert_eq!(difficulty_level(None), 2);
    }
}
