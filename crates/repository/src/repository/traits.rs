//! Repository contracts and the base implementations that produce them

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::capabilities::{CapabilitySet, RepositoryMode};
use crate::datasource::{DataSource, KeyTtl, KeyValueDataSource};
use crate::error::RepositoryResult;
use crate::filter::{Filter, Where};
use crate::model::{ModelDefinition, Record};

/// Generic data access for one model
#[async_trait]
pub trait CrudRepository: Send + Sync {
    /// The model this repository is bound to
    fn model(&self) -> &Arc<ModelDefinition>;

    async fn create(&self, data: Record) -> RepositoryResult<Record>;

    async fn create_all(&self, data: Vec<Record>) -> RepositoryResult<Vec<Record>>;

    async fn find(&self, filter: Option<Filter>) -> RepositoryResult<Vec<Record>>;

    async fn update_all(&self, data: Record, where_clause: Option<Where>) -> RepositoryResult<u64>;

    async fn delete_all(&self, where_clause: Option<Where>) -> RepositoryResult<u64>;

    async fn count(&self, where_clause: Option<Where>) -> RepositoryResult<u64>;
}

/// CRUD plus id-based access for entities
#[async_trait]
pub trait EntityCrudRepository: CrudRepository {
    async fn find_by_id(&self, id: &Value) -> RepositoryResult<Option<Record>>;

    async fn update_by_id(&self, id: &Value, data: Record) -> RepositoryResult<bool>;

    async fn replace_by_id(&self, id: &Value, data: Record) -> RepositoryResult<bool>;

    async fn delete_by_id(&self, id: &Value) -> RepositoryResult<bool>;

    async fn exists(&self, id: &Value) -> RepositoryResult<bool>;

    /// Create the record when it has no id or no stored counterpart, replace it otherwise
    async fn save(&self, data: Record) -> RepositoryResult<Record>;
}

/// Key-value access for one model
#[async_trait]
pub trait KeyValueRepository: Send + Sync {
    fn model(&self) -> &Arc<ModelDefinition>;

    async fn get(&self, key: &str) -> RepositoryResult<Option<Record>>;

    async fn set(&self, key: &str, value: Record, ttl: Option<Duration>) -> RepositoryResult<()>;

    async fn delete(&self, key: &str) -> RepositoryResult<bool>;

    async fn delete_all(&self) -> RepositoryResult<u64>;

    async fn expire(&self, key: &str, ttl: Duration) -> RepositoryResult<bool>;

    async fn ttl(&self, key: &str) -> RepositoryResult<KeyTtl>;

    async fn keys(&self, pattern: Option<&str>) -> RepositoryResult<Vec<String>>;
}

/// Base implementation able to back plain-model CRUD repositories
pub trait CrudBase: Send + Sync {
    fn name(&self) -> &str;

    /// Operations this base provides
    fn capabilities(&self) -> CapabilitySet;

    fn bind(&self, model: Arc<ModelDefinition>, data_source: Arc<dyn DataSource>) -> Arc<dyn CrudRepository>;
}

/// Base implementation able to back entity repositories
pub trait EntityCrudBase: CrudBase {
    fn bind_entity(
        &self,
        model: Arc<ModelDefinition>,
        data_source: Arc<dyn DataSource>,
    ) -> Arc<dyn EntityCrudRepository>;
}

/// Base implementation able to back key-value repositories
pub trait KeyValueBase: Send + Sync {
    fn name(&self) -> &str;

    fn capabilities(&self) -> CapabilitySet;

    fn bind(
        &self,
        model: Arc<ModelDefinition>,
        data_source: Arc<dyn KeyValueDataSource>,
    ) -> Arc<dyn KeyValueRepository>;
}

/// A base implementation handed to the repository factory
#[derive(Clone)]
pub enum BaseImplementation {
    Crud(Arc<dyn CrudBase>),
    EntityCrud(Arc<dyn EntityCrudBase>),
    KeyValue(Arc<dyn KeyValueBase>),
}

impl BaseImplementation {
    pub fn crud(base: impl CrudBase + 'static) -> Self {
        BaseImplementation::Crud(Arc::new(base))
    }

    pub fn entity_crud(base: impl EntityCrudBase + 'static) -> Self {
        BaseImplementation::EntityCrud(Arc::new(base))
    }

    pub fn key_value(base: impl KeyValueBase + 'static) -> Self {
        BaseImplementation::KeyValue(Arc::new(base))
    }

    pub fn name(&self) -> &str {
        match self {
            BaseImplementation::Crud(base) => base.name(),
            BaseImplementation::EntityCrud(base) => base.name(),
            BaseImplementation::KeyValue(base) => base.name(),
        }
    }

    /// Declared capabilities
    pub fn capabilities(&self) -> CapabilitySet {
        match self {
            BaseImplementation::Crud(base) => base.capabilities(),
            BaseImplementation::EntityCrud(base) => base.capabilities(),
            BaseImplementation::KeyValue(base) => base.capabilities(),
        }
    }

    /// Declared capabilities limited to what the base's contract can actually bind
    pub fn effective_capabilities(&self) -> CapabilitySet {
        let contract = match self {
            BaseImplementation::Crud(_) => RepositoryMode::Crud.required(),
            BaseImplementation::EntityCrud(_) => RepositoryMode::EntityCrud.required(),
            BaseImplementation::KeyValue(_) => RepositoryMode::KeyValue.required(),
        };
        self.capabilities().intersection(&contract)
    }
}

impl std::fmt::Debug for BaseImplementation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let variant = match self {
            BaseImplementation::Crud(_) => "Crud",
            BaseImplementation::EntityCrud(_) => "EntityCrud",
            BaseImplementation::KeyValue(_) => "KeyValue",
        };
        f.debug_struct("BaseImplementation")
            .field("kind", &variant)
            .field("name", &self.name())
            .finish()
    }
}
