//! Named repository instances for the plain CRUD and key-value modes

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::traits::{CrudRepository, KeyValueRepository};
use crate::datasource::KeyTtl;
use crate::error::RepositoryResult;
use crate::filter::{Filter, Where};
use crate::model::{ModelDefinition, Record};

/// CRUD repository over a plain model; no id-based operations
pub struct CrudRepositoryInstance {
    name: String,
    inner: Arc<dyn CrudRepository>,
}

impl CrudRepositoryInstance {
    pub(crate) fn new(name: String, inner: Arc<dyn CrudRepository>) -> Self {
        Self { name, inner }
    }

    /// Repository type name, `<Model>Repository`
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl CrudRepository for CrudRepositoryInstance {
    fn model(&self) -> &Arc<ModelDefinition> {
        self.inner.model()
    }

    async fn create(&self, data: Record) -> RepositoryResult<Record> {
        self.inner.create(data).await
    }

    async fn create_all(&self, data: Vec<Record>) -> RepositoryResult<Vec<Record>> {
        self.inner.create_all(data).await
    }

    async fn find(&self, filter: Option<Filter>) -> RepositoryResult<Vec<Record>> {
        self.inner.find(filter).await
    }

    async fn update_all(&self, data: Record, where_clause: Option<Where>) -> RepositoryResult<u64> {
        self.inner.update_all(data, where_clause).await
    }

    async fn delete_all(&self, where_clause: Option<Where>) -> RepositoryResult<u64> {
        self.inner.delete_all(where_clause).await
    }

    async fn count(&self, where_clause: Option<Where>) -> RepositoryResult<u64> {
        self.inner.count(where_clause).await
    }
}

impl std::fmt::Debug for CrudRepositoryInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrudRepositoryInstance")
            .field("name", &self.name)
            .finish()
    }
}

/// Key-value repository; exposes no relations
pub struct KeyValueRepositoryInstance {
    name: String,
    inner: Arc<dyn KeyValueRepository>,
}

impl KeyValueRepositoryInstance {
    pub(crate) fn new(name: String, inner: Arc<dyn KeyValueRepository>) -> Self {
        Self { name, inner }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl KeyValueRepository for KeyValueRepositoryInstance {
    fn model(&self) -> &Arc<ModelDefinition> {
        self.inner.model()
    }

    async fn get(&self, key: &str) -> RepositoryResult<Option<Record>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Record, ttl: Option<Duration>) -> RepositoryResult<()> {
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> RepositoryResult<bool> {
        self.inner.delete(key).await
    }

    async fn delete_all(&self) -> RepositoryResult<u64> {
        self.inner.delete_all().await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> RepositoryResult<bool> {
        self.inner.expire(key, ttl).await
    }

    async fn ttl(&self, key: &str) -> RepositoryResult<KeyTtl> {
        self.inner.ttl(key).await
    }

    async fn keys(&self, pattern: Option<&str>) -> RepositoryResult<Vec<String>> {
        self.inner.keys(pattern).await
    }
}

impl std::fmt::Debug for KeyValueRepositoryInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyValueRepositoryInstance")
            .field("name", &self.name)
            .finish()
    }
}
