//! Data Source Abstractions
//!
//! The persistence contract consumed by repositories. Connectors implement
//! `DataSource` for collection-style CRUD and `KeyValueDataSource` for
//! key-value stores; `MemoryDataSource` implements both in process.

pub mod memory;

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::filter::{Filter, Where};
use crate::model::{ModelDefinition, Record};

pub use memory::MemoryDataSource;

/// Result type alias for data source operations
pub type DataSourceResult<T> = Result<T, DataSourceError>;

/// Faults raised by data sources
///
/// Repositories never wrap or retry these; they reach the caller unchanged.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DataSourceError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Operation '{operation}' timed out")]
    Timeout { operation: String },

    #[error("Operation was cancelled")]
    Cancelled,

    #[error("Duplicate id {id} for model '{model}'")]
    DuplicateId { model: String, id: Value },

    #[error("Constraint violation on '{model}': {message}")]
    ConstraintViolation { model: String, message: String },

    #[error("Operation '{operation}' is not supported by this data source")]
    Unsupported { operation: String },

    #[error("Backend error: {0}")]
    Backend(String),
}

/// Collection-style CRUD contract, scoped per call to one model
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Connector name, used in logs
    fn name(&self) -> &str;

    /// Insert a record, returning it with any generated id filled in
    async fn create(&self, model: &ModelDefinition, data: Record) -> DataSourceResult<Record>;

    /// Insert several records in order
    async fn create_all(
        &self,
        model: &ModelDefinition,
        data: Vec<Record>,
    ) -> DataSourceResult<Vec<Record>> {
        let mut created = Vec::with_capacity(data.len());
        for record in data {
            created.push(self.create(model, record).await?);
        }
        Ok(created)
    }

    async fn find_by_id(&self, model: &ModelDefinition, id: &Value) -> DataSourceResult<Option<Record>>;

    async fn find(&self, model: &ModelDefinition, filter: &Filter) -> DataSourceResult<Vec<Record>>;

    /// Patch the fields present in `data`; `false` when no record has this id
    async fn update_by_id(&self, model: &ModelDefinition, id: &Value, data: &Record) -> DataSourceResult<bool>;

    /// Replace the whole record; `false` when no record has this id
    async fn replace_by_id(&self, model: &ModelDefinition, id: &Value, data: &Record) -> DataSourceResult<bool>;

    /// Patch every record matching `where_clause`, returning how many changed
    async fn update_all(
        &self,
        model: &ModelDefinition,
        data: &Record,
        where_clause: Option<&Where>,
    ) -> DataSourceResult<u64>;

    async fn delete_by_id(&self, model: &ModelDefinition, id: &Value) -> DataSourceResult<bool>;

    async fn delete_all(&self, model: &ModelDefinition, where_clause: Option<&Where>) -> DataSourceResult<u64>;

    async fn count(&self, model: &ModelDefinition, where_clause: Option<&Where>) -> DataSourceResult<u64>;
}

/// Remaining lifetime of a key-value entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTtl {
    /// No entry under this key
    Missing,
    /// Entry never expires
    Persistent,
    /// Entry expires after this duration
    Expires(Duration),
}

/// Key-value contract, scoped per call to one model
#[async_trait]
pub trait KeyValueDataSource: Send + Sync {
    fn name(&self) -> &str;

    async fn get(&self, model: &str, key: &str) -> DataSourceResult<Option<Record>>;

    async fn set(&self, model: &str, key: &str, value: Record, ttl: Option<Duration>) -> DataSourceResult<()>;

    async fn delete(&self, model: &str, key: &str) -> DataSourceResult<bool>;

    async fn delete_all(&self, model: &str) -> DataSourceResult<u64>;

    /// Set a new expiry on an existing entry; `false` when the key is missing
    async fn expire(&self, model: &str, key: &str, ttl: Duration) -> DataSourceResult<bool>;

    async fn ttl(&self, model: &str, key: &str) -> DataSourceResult<KeyTtl>;

    /// Live keys, optionally filtered by a glob pattern (`user:*`)
    async fn keys(&self, model: &str, pattern: Option<&str>) -> DataSourceResult<Vec<String>>;
}
