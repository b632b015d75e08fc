//! Client for the generative-AI endpoint.
//!
//! The pipelines treat text generation as an opaque call: a prompt, the
//! source text it applies to, and a requested response shape go in; a
//! parsed payload or a failure comes out. HTTP 429 is surfaced as
//! [`LlmError::RateLimited`] so callers can distinguish "try again
//! shortly" from "this input is wrong".

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::extraction::extract_json;
use crate::config::AppConfig;
use crate::error::LlmError;

/// Requested shape of the generated payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// Parse the response as JSON (extracting it from fences if needed).
    Json,
    /// Return the raw response text as a JSON string value.
    Text,
}

/// Opaque text-generation boundary used by the AI-backed tasks.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Applies `prompt` to `source` and returns the parsed payload.
    async fn generate(
        &self,
        prompt: &str,
        source: &str,
        shape: ResponseShape,
    ) -> Result<Value, LlmError>;
}

/// A message in a conversation with the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

impl Message {
    fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Request body for the OpenAI-compatible chat completions endpoint.
#[derive(Debug, Serialize)]
struct ApiRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Client for an OpenAI-compatible chat completions API.
pub struct GenAiClient {
    api_base: String,
    api_key: Option<String>,
    model: String,
    temperature: f64,
    http_client: Client,
}

impl GenAiClient {
    /// Creates a client with explicit configuration.
    pub fn new(api_base: String, api_key: Option<String>, model: String) -> Self {
        Self {
            api_base,
            api_key,
            model,
            temperature: 0.3,
            http_client: Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .unwrap_or_default(),
        }
    }

    /// Creates a client from application configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self, LlmError> {
        if config.api_base.is_empty() {
            return Err(LlmError::MissingApiBase);
        }
        let mut client = Self::new(
            config.api_base.clone(),
            config.api_key.clone(),
            config.model.clone(),
        );
        client.temperature = config.temperature;
        Ok(client)
    }

    /// The configured model identifier.
    pub fn model(&self) -> &str {
        &self.model
    }

    async fn chat(&self, messages: Vec<Message>) -> Result<String, LlmError> {
        let request = ApiRequest {
            model: self.model.clone(),
            messages,
            temperature: Some(self.temperature),
            max_tokens: Some(2000),
        };

        let url = format!("{}/chat/completions", self.api_base);
        let mut http_request = self
            .http_client
            .post(&url)
            .header("Content-Type", "application/json");

        if let Some(ref api_key) = self.api_key {
            http_request = http_request.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = http_request
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let status_code = status.as_u16();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error response".to_string());

            if let Ok(parsed) = serde_json::from_str::<ApiErrorResponse>(&error_text) {
                if status_code == 429 {
                    return Err(LlmError::RateLimited(parsed.error.message));
                }
                return Err(LlmError::ApiError {
                    code: status_code,
                    message: parsed.error.message,
                });
            }
            if status_code == 429 {
                return Err(LlmError::RateLimited(
                    "AI service is busy, please try again shortly".to_string(),
                ));
            }
            return Err(LlmError::ApiError {
                code: status_code,
                message: error_text,
            });
        }

        let parsed: ApiResponse = response
            .json()
            .await
            .map_err(|e| LlmError::ParseError(format!("Failed to parse API response: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| LlmError::ParseError("No content in model response".to_string()))
    }
}

#[async_trait]
impl TextGenerator for GenAiClient {
    async fn generate(
        &self,
        prompt: &str,
        source: &str,
        shape: ResponseShape,
    ) -> Result<Value, LlmError> {
        let system = match shape {
            ResponseShape::Json => {
                "You are a content analysis assistant. Respond with valid JSON only."
            }
            ResponseShape::Text => "You are a content analysis assistant. Respond with plain text.",
        };

        let user = format!("{prompt}\n\n---\n\n{source}");
        let content = self.chat(vec![Message::system(system), Message::user(user)]).await?;

        tracing::debug!(
            model = %self.model,
            shape = ?shape,
            response_chars = content.len(),
            "Generation call completed"
        );

        match shape {
            ResponseShape::Json => extract_json(&content),
            ResponseShape::Text => Ok(Value::String(content)),
        }
    }
}
