//! Error types for quizforge collaborator boundaries.
//!
//! Defines error types for the external services the pipelines talk to:
//! - The generative-AI endpoint
//! - The hosted record store

use thiserror::Error;

/// Errors that can occur when calling the generative-AI endpoint.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Missing API key: QUIZFORGE_API_KEY environment variable not set")]
    MissingApiKey,

    #[error("Missing API base URL: QUIZFORGE_API_BASE environment variable not set")]
    MissingApiBase,

    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Failed to parse model response: {0}")]
    ParseError(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("API error ({code}): {message}")]
    ApiError { code: u16, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LlmError {
    /// Whether retrying the same request shortly may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LlmError::RateLimited(_) | LlmError::RequestFailed(_)
        )
    }
}

/// Errors that can occur against the hosted record store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store request failed: {0}")]
    RequestFailed(String),

    #[error("Store rejected {op} on '{table}': {message}")]
    OperationFailed {
        op: &'static str,
        table: String,
        message: String,
    },

    #[error("Unexpected store response shape: {0}")]
    UnexpectedShape(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
