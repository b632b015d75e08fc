//! Application configuration.
//!
//! Env-driven settings for the two external collaborators (the AI endpoint
//! and the hosted record store) plus generation defaults.

use thiserror::Error;

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    /// An environment variable has an invalid value.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Configuration for pipeline collaborators.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Base URL of the OpenAI-compatible generation API.
    pub api_base: String,
    /// API key for the generation API.
    pub api_key: Option<String>,
    /// Model identifier for generation calls.
    pub model: String,
    /// Sampling temperature for generation calls.
    pub temperature: f64,
    /// Base URL of the hosted record store's REST endpoint.
    pub store_url: String,
    /// API key for the record store.
    pub store_key: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            temperature: 0.3,
            store_url: "http://localhost:54321/rest/v1".to_string(),
            store_key: None,
        }
    }
}

impl AppConfig {
    /// Creates configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `QUIZFORGE_API_BASE`: generation API base URL (default: OpenAI)
    /// - `QUIZFORGE_API_KEY`: generation API key (optional)
    /// - `QUIZFORGE_MODEL`: model identifier (default: gpt-4o-mini)
    /// - `QUIZFORGE_TEMPERATURE`: sampling temperature (default: 0.3)
    /// - `QUIZFORGE_STORE_URL`: record store REST base URL (required)
    /// - `QUIZFORGE_STORE_KEY`: record store API key (optional)
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("QUIZFORGE_API_BASE") {
            config.api_base = val;
        }
        config.api_key = std::env::var("QUIZFORGE_API_KEY").ok();
        if let Ok(val) = std::env::var("QUIZFORGE_MODEL") {
            config.model = val;
        }
        if let Ok(val) = std::env::var("QUIZFORGE_TEMPERATURE") {
            config.temperature = parse_env_value(&val, "QUIZFORGE_TEMPERATURE")?;
        }

        config.store_url = std::env::var("QUIZFORGE_STORE_URL")
            .map_err(|_| ConfigError::MissingEnvVar("QUIZFORGE_STORE_URL".to_string()))?;
        config.store_key = std::env::var("QUIZFORGE_STORE_KEY").ok();

        config.validate()?;
        Ok(config)
    }

    /// Validates value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::InvalidValue {
                key: "QUIZFORGE_TEMPERATURE".to_string(),
                message: format!("{} is outside [0.0, 2.0]", self.temperature),
            });
        }
        if self.store_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "QUIZFORGE_STORE_URL".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Parses an environment variable value into a typed field.
fn parse_env_value<T: std::str::FromStr>(value: &str, key: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_temperature_range_enforced() {
        let mut config = AppConfig::default();
        config.temperature = 3.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_empty_store_url_rejected() {
        let mut config = AppConfig::default();
        config.store_url = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_env_value() {
        let parsed: f64 = parse_env_value("0.7", "KEY").expect("parse");
        assert!((parsed - 0.7).abs() < f64::EPSILON);
        assert!(parse_env_value::<f64>("not-a-number", "KEY").is_err());
    }
}
