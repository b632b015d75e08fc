//! In-memory record store used in tests and local development.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Filters, RecordStore};
use crate::error::StoreError;

/// A table-keyed in-memory store with the same observable semantics as the
/// hosted one: inserts return the stored row (with a generated `id` when
/// the record has none), selects apply equality filters.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<std::collections::BTreeMap<String, Vec<Value>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a table with records, replacing any existing contents.
    pub async fn seed(&self, table: &str, records: Vec<Value>) {
        self.tables.write().await.insert(table.to_string(), records);
    }

    /// Number of records currently in a table.
    pub async fn count(&self, table: &str) -> usize {
        self.tables
            .read()
            .await
            .get(table)
            .map(|rows| rows.len())
            .unwrap_or(0)
    }
}

fn matches(record: &Value, filters: &Filters) -> bool {
    filters
        .iter()
        .all(|(column, expected)| record.get(column) == Some(expected))
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn insert_returning(&self, table: &str, record: Value) -> Result<Value, StoreError> {
        let mut record = record;
        let Some(map) = record.as_object_mut() else {
            return Err(StoreError::UnexpectedShape(
                "insert payload must be a JSON object".to_string(),
            ));
        };
        map.entry("id")
            .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));

        let mut tables = self.tables.write().await;
        tables
            .entry(table.to_string())
            .or_default()
            .push(record.clone());
        Ok(record)
    }

    async fn select_filtered(
        &self,
        table: &str,
        filters: &Filters,
    ) -> Result<Vec<Value>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| matches(row, filters))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
