//! Default key-value base

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::capabilities::CapabilitySet;
use super::traits::{KeyValueBase, KeyValueRepository};
use crate::datasource::{KeyTtl, KeyValueDataSource};
use crate::error::RepositoryResult;
use crate::model::{ModelDefinition, Record};

/// Default base for key-value repositories
///
/// Entries written without an explicit expiry get `default_ttl`, if any.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultKeyValueRepository {
    default_ttl: Option<Duration>,
}

impl DefaultKeyValueRepository {
    pub const NAME: &'static str = "DefaultKeyValueRepository";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_ttl(default_ttl: Option<Duration>) -> Self {
        Self { default_ttl }
    }

    pub fn default_ttl(&self) -> Option<Duration> {
        self.default_ttl
    }
}

impl KeyValueBase for DefaultKeyValueRepository {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::key_value()
    }

    fn bind(
        &self,
        model: Arc<ModelDefinition>,
        data_source: Arc<dyn KeyValueDataSource>,
    ) -> Arc<dyn KeyValueRepository> {
        Arc::new(DataSourceKeyValueRepository {
            model,
            data_source,
            default_ttl: self.default_ttl,
        })
    }
}

/// Key-value repository bound to one model and one data source
pub struct DataSourceKeyValueRepository {
    model: Arc<ModelDefinition>,
    data_source: Arc<dyn KeyValueDataSource>,
    default_ttl: Option<Duration>,
}

#[async_trait]
impl KeyValueRepository for DataSourceKeyValueRepository {
    fn model(&self) -> &Arc<ModelDefinition> {
        &self.model
    }

    async fn get(&self, key: &str) -> RepositoryResult<Option<Record>> {
        Ok(self.data_source.get(&self.model.name, key).await?)
    }

    async fn set(&self, key: &str, value: Record, ttl: Option<Duration>) -> RepositoryResult<()> {
        let ttl = ttl.or(self.default_ttl);
        Ok(self.data_source.set(&self.model.name, key, value, ttl).await?)
    }

    async fn delete(&self, key: &str) -> RepositoryResult<bool> {
        Ok(self.data_source.delete(&self.model.name, key).await?)
    }

    async fn delete_all(&self) -> RepositoryResult<u64> {
        Ok(self.data_source.delete_all(&self.model.name).await?)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> RepositoryResult<bool> {
        Ok(self.data_source.expire(&self.model.name, key, ttl).await?)
    }

    async fn ttl(&self, key: &str) -> RepositoryResult<KeyTtl> {
        Ok(self.data_source.ttl(&self.model.name, key).await?)
    }

    async fn keys(&self, pattern: Option<&str>) -> RepositoryResult<Vec<String>> {
        Ok(self.data_source.keys(&self.model.name, pattern).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::MemoryDataSource;
    use crate::model::FieldType;

    #[tokio::test]
    async fn test_default_ttl_applies_only_when_unset() {
        let model = Arc::new(ModelDefinition::entity("Session").id("token", FieldType::String));
        let base = DefaultKeyValueRepository::with_default_ttl(Some(Duration::from_secs(60)));
        let repo = base.bind(model, Arc::new(MemoryDataSource::default()));

        repo.set("a", Record::new().with("user", 1), None).await.unwrap();
        repo.set("b", Record::new().with("user", 2), Some(Duration::from_secs(5))).await.unwrap();

        match repo.ttl("a").await.unwrap() {
            KeyTtl::Expires(left) => assert!(left > Duration::from_secs(5)),
            other => panic!("expected an expiry, got {:?}", other),
        }
        match repo.ttl("b").await.unwrap() {
            KeyTtl::Expires(left) => assert!(left <= Duration::from_secs(5)),
            other => panic!("expected an expiry, got {:?}", other),
        }
        assert_eq!(repo.keys(None).await.unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_models_do_not_share_keys() {
        let ds: Arc<dyn KeyValueDataSource> = Arc::new(MemoryDataSource::default());
        let base = DefaultKeyValueRepository::new();
        let sessions = base.bind(Arc::new(ModelDefinition::entity("Session").id("k", FieldType::String)), ds.clone());
        let carts = base.bind(Arc::new(ModelDefinition::entity("Cart").id("k", FieldType::String)), ds);

        sessions.set("1", Record::new(), None).await.unwrap();
        assert!(carts.get("1").await.unwrap().is_none());
        assert_eq!(carts.ttl("1").await.unwrap(), KeyTtl::Missing);
        assert_eq!(sessions.delete_all().await.unwrap(), 1);
    }
}
