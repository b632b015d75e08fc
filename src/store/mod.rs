//! The hosted record store boundary.
//!
//! Pipelines persist and query through the [`RecordStore`] trait:
//! record-oriented operations scoped by table name. The store's internal
//! consistency model is a black box; this subsystem assumes only that an
//! insert returns the inserted row or a descriptive error.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StoreError;

pub mod memory;
pub mod rest;

pub use memory::MemoryStore;
pub use rest::RestStore;

/// Equality filters applied to a select, keyed by column name.
pub type Filters = BTreeMap<String, Value>;

/// Record-oriented operations against the hosted store.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Inserts a record and returns the stored row.
    async fn insert_returning(&self, table: &str, record: Value) -> Result<Value, StoreError>;

    /// Selects all records matching every filter.
    async fn select_filtered(&self, table: &str, filters: &Filters)
        -> Result<Vec<Value>, StoreError>;
}
