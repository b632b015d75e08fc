//! Generative-AI integration.
//!
//! The AI-backed pipeline tasks call text generation through the
//! [`TextGenerator`] trait; [`GenAiClient`] implements it over an
//! OpenAI-compatible HTTP API.

pub mod client;
pub mod extraction;

pub use client::{GenAiClient, ResponseShape, TextGenerator};
pub use extraction::extract_json;
