//! Command-line interface for quizforge.
//!
//! Provides commands for ingesting source content, building trivia sets,
//! and listing the available pipelines.

mod commands;

pub use commands::{parse_cli, run, run_with_cli, Cli};
