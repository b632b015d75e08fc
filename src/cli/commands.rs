//! CLI command definitions for quizforge.
//!
//! Each subcommand wires the configured collaborators into a pipeline,
//! runs it, and prints the aggregate result as JSON.

use std::fs;
use std::sync::Arc;

use clap::Parser;
use serde_json::{json, Map, Value};
use tracing::info;

use crate::config::AppConfig;
use crate::engine::{Goal, PipelineOptions, PipelineStatus};
use crate::llm::GenAiClient;
use crate::pipelines::{registry, Pipeline};
use crate::store::RestStore;

/// Trivia content pipeline runner.
#[derive(Parser)]
#[command(name = "quizforge")]
#[command(about = "Turn raw text into structured trivia content")]
#[command(version)]
#[command(
    long_about = "quizforge runs the content pipelines of a trivia content-management system: \
ingest raw source text through AI analysis, and build balanced trivia sets from stored \
questions.\n\nExample usage:\n  quizforge ingest --file article.txt\n  quizforge build --theme space --count 10"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Ingest raw source text: normalize, analyze and persist it.
    Ingest(IngestArgs),

    /// Build a balanced trivia set from stored questions.
    Build(BuildArgs),

    /// List the available pipelines and the rules they accept.
    Pipelines,
}

/// Arguments for `quizforge ingest`.
#[derive(Parser, Debug)]
pub struct IngestArgs {
    /// Read the source text from a file.
    #[arg(short, long, conflicts_with = "text")]
    pub file: Option<String>,

    /// Pass the source text inline.
    #[arg(short, long)]
    pub text: Option<String>,

    /// Expected language of the source text (ISO 639-1).
    #[arg(long)]
    pub language: Option<String>,

    /// Maximum summary length in characters (50-2000).
    #[arg(long)]
    pub max_summary_length: Option<u32>,

    /// Continue past a failed task and report a partial result.
    #[arg(long)]
    pub allow_partial: bool,
}

/// Arguments for `quizforge build`.
#[derive(Parser, Debug)]
pub struct BuildArgs {
    /// Theme to build the set for.
    #[arg(short, long)]
    pub theme: String,

    /// Number of questions in the set (1-50).
    #[arg(short = 'n', long)]
    pub count: Option<u32>,

    /// Distribution strategy across question types (even, weighted, custom).
    #[arg(short, long)]
    pub distribution: Option<String>,

    /// Comma-separated question types to include
    /// (multiple_choice, true_false, open_ended).
    #[arg(long)]
    pub types: Option<String>,

    /// Accept a smaller set when the pool cannot satisfy the count.
    #[arg(long)]
    pub allow_partial: bool,

    /// Seed for reproducible selection.
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Parses command-line arguments.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Parses arguments and runs the selected command.
pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

/// Runs the selected command with pre-parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Ingest(args) => ingest(args).await,
        Commands::Build(args) => build(args).await,
        Commands::Pipelines => pipelines(),
    }
}

fn options(allow_partial: bool) -> PipelineOptions {
    PipelineOptions::default()
        .with_partial_results(allow_partial)
        .with_progress_sink(Arc::new(|event| {
            info!(
                task = %event.task_id,
                status = %event.status,
                progress = event.progress,
                "progress"
            );
        }))
}

fn print_result(result: &crate::engine::PipelineResult) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(result)?);
    if result.status == PipelineStatus::Error {
        anyhow::bail!("Pipeline '{}' failed", result.pipeline_id);
    }
    Ok(())
}

async fn ingest(args: IngestArgs) -> anyhow::Result<()> {
    let source_text = match (&args.file, &args.text) {
        (Some(path), _) => fs::read_to_string(path)?,
        (None, Some(text)) => text.clone(),
        (None, None) => anyhow::bail!("Provide the source text via --file or --text"),
    };

    let config = AppConfig::from_env()?;
    let generator = Arc::new(GenAiClient::from_config(&config)?);
    let store = Arc::new(RestStore::from_config(&config));
    let pipeline = Pipeline::ingest_source_content(generator, store);

    let mut rules = Map::new();
    rules.insert("source_text".to_string(), json!(source_text));
    if let Some(language) = args.language {
        rules.insert("language".to_string(), json!(language));
    }
    if let Some(max) = args.max_summary_length {
        rules.insert("max_summary_length".to_string(), json!(max));
    }

    let result = pipeline
        .execute(
            Goal::new("Ingest source content from the command line"),
            rules,
            options(args.allow_partial),
        )
        .await;
    print_result(&result)
}

async fn build(args: BuildArgs) -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    let store = Arc::new(RestStore::from_config(&config));
    let pipeline = Pipeline::build_trivia_set(store);

    let mut rules = Map::new();
    rules.insert("theme".to_string(), json!(args.theme));
    if let Some(count) = args.count {
        rules.insert("count".to_string(), json!(count));
    }
    if let Some(distribution) = args.distribution {
        rules.insert("distribution".to_string(), json!(distribution));
    }
    if let Some(types) = args.types {
        let types: Vec<Value> = types.split(',').map(|t| json!(t.trim())).collect();
        rules.insert("question_types".to_string(), Value::Array(types));
    }
    if args.allow_partial {
        rules.insert("allow_partial_sets".to_string(), json!(true));
    }
    if let Some(seed) = args.seed {
        rules.insert("seed".to_string(), json!(seed));
    }

    let result = pipeline
        .execute(
            Goal::new(format!("Build a trivia set about {}", args.theme)),
            rules,
            options(args.allow_partial),
        )
        .await;
    print_result(&result)
}

fn pipelines() -> anyhow::Result<()> {
    for metadata in registry().all() {
        println!("{} (v{})", metadata.id, metadata.version);
        println!("  {}", metadata.description);
        println!("  tasks: {}", metadata.task_ids.join(" -> "));
        println!("  required rules: {}", metadata.required_rules.join(", "));
        if !metadata.optional_rules.is_empty() {
            println!("  optional rules: {}", metadata.optional_rules.join(", "));
        }
        println!();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_build_args_parse() {
        let cli = Cli::try_parse_from([
            "quizforge", "build", "--theme", "space", "-n", "12", "--seed", "7",
        ])
        .expect("parses");
        match cli.command {
            Commands::Build(args) => {
                assert_eq!(args.theme, "space");
                assert_eq!(args.count, Some(12));
                assert_eq!(args.seed, Some(7));
                assert!(!args.allow_partial);
            }
            _ => panic!("expected build"),
        }
    }

    #[test]
    fn test_ingest_rejects_file_and_text_together() {
        let parsed = Cli::try_parse_from([
            "quizforge", "ingest", "--file", "a.txt", "--text", "hello",
        ]);
        assert!(parsed.is_err());
    }
}
