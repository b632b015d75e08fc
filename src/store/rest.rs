//! REST client for the hosted record store.
//!
//! Speaks the PostgREST-style dialect the hosted store exposes: tables are
//! URL path segments, equality filters are `column=eq.value` query pairs,
//! and `Prefer: return=representation` makes inserts echo the stored row.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use super::{Filters, RecordStore};
use crate::config::AppConfig;
use crate::error::StoreError;

/// HTTP client for the hosted record store.
pub struct RestStore {
    base_url: String,
    api_key: Option<String>,
    http_client: Client,
}

impl RestStore {
    /// Creates a client for the store at `base_url`.
    pub fn new(base_url: String, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            http_client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
        }
    }

    /// Creates a client from application configuration.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.store_url.clone(), config.store_key.clone())
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder
                .header("apikey", key)
                .header("Authorization", format!("Bearer {}", key)),
            None => builder,
        }
    }

    fn filter_value(value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

#[async_trait]
impl RecordStore for RestStore {
    async fn insert_returning(&self, table: &str, record: Value) -> Result<Value, StoreError> {
        let url = format!("{}/{}", self.base_url, table);
        let response = self
            .request(self.http_client.post(&url))
            .header("Prefer", "return=representation")
            .json(&record)
            .send()
            .await
            .map_err(|e| StoreError::RequestFailed(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StoreError::RequestFailed(e.to_string()))?;

        if !status.is_success() {
            return Err(StoreError::OperationFailed {
                op: "insert",
                table: table.to_string(),
                message: format!("{status}: {body}"),
            });
        }

        // The store echoes inserted rows as a one-element array.
        let parsed: Value = serde_json::from_str(&body)?;
        match parsed {
            Value::Array(mut rows) if !rows.is_empty() => Ok(rows.remove(0)),
            Value::Object(map) => Ok(Value::Object(map)),
            other => Err(StoreError::UnexpectedShape(format!(
                "insert response was not a row: {other}"
            ))),
        }
    }

    async fn select_filtered(
        &self,
        table: &str,
        filters: &Filters,
    ) -> Result<Vec<Value>, StoreError> {
        let url = format!("{}/{}", self.base_url, table);
        let query: Vec<(String, String)> = filters
            .iter()
            .map(|(column, value)| (column.clone(), format!("eq.{}", Self::filter_value(value))))
            .collect();

        let response = self
            .request(self.http_client.get(&url))
            .query(&query)
            .send()
            .await
            .map_err(|e| StoreError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::OperationFailed {
                op: "select",
                table: table.to_string(),
                message: format!("{status}: {body}"),
            });
        }

        let rows: Value = response
            .json()
            .await
            .map_err(|e| StoreError::RequestFailed(e.to_string()))?;

        match rows {
            Value::Array(rows) => Ok(rows),
            other => Err(StoreError::UnexpectedShape(format!(
                "select response was not an array: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let store = RestStore::new("https://db.example.test/rest/v1/".to_string(), None);
        assert_eq!(store.base_url, "https://db.example.test/rest/v1");
    }

    #[test]
    fn test_filter_value_rendering() {
        assert_eq!(RestStore::filter_value(&json!("space")), "space");
        assert_eq!(RestStore::filter_value(&json!(5)), "5");
        assert_eq!(RestStore::filter_value(&json!(true)), "true");
    }
}
