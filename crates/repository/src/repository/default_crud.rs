//! Default CRUD base - delegates every operation to the data source

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::capabilities::CapabilitySet;
use super::traits::{CrudBase, CrudRepository, EntityCrudBase, EntityCrudRepository};
use crate::datasource::DataSource;
use crate::error::RepositoryResult;
use crate::filter::{Filter, Where};
use crate::model::{ModelDefinition, Record};

/// Default base for plain-model and entity repositories
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCrudRepository;

impl DefaultCrudRepository {
    pub const NAME: &'static str = "DefaultCrudRepository";
}

impl CrudBase for DefaultCrudRepository {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::entity_crud()
    }

    fn bind(&self, model: Arc<ModelDefinition>, data_source: Arc<dyn DataSource>) -> Arc<dyn CrudRepository> {
        Arc::new(DataSourceRepository::new(model, data_source))
    }
}

impl EntityCrudBase for DefaultCrudRepository {
    fn bind_entity(
        &self,
        model: Arc<ModelDefinition>,
        data_source: Arc<dyn DataSource>,
    ) -> Arc<dyn EntityCrudRepository> {
        Arc::new(DataSourceRepository::new(model, data_source))
    }
}

/// Repository bound to one model and one data source
pub struct DataSourceRepository {
    model: Arc<ModelDefinition>,
    data_source: Arc<dyn DataSource>,
}

impl DataSourceRepository {
    pub fn new(model: Arc<ModelDefinition>, data_source: Arc<dyn DataSource>) -> Self {
        Self { model, data_source }
    }

    pub fn data_source(&self) -> &Arc<dyn DataSource> {
        &self.data_source
    }
}

impl std::fmt::Debug for DataSourceRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataSourceRepository")
            .field("model", &self.model.name)
            .field("data_source", &self.data_source.name())
            .finish()
    }
}

#[async_trait]
impl CrudRepository for DataSourceRepository {
    fn model(&self) -> &Arc<ModelDefinition> {
        &self.model
    }

    async fn create(&self, data: Record) -> RepositoryResult<Record> {
        Ok(self.data_source.create(&self.model, data).await?)
    }

    async fn create_all(&self, data: Vec<Record>) -> RepositoryResult<Vec<Record>> {
        Ok(self.data_source.create_all(&self.model, data).await?)
    }

    async fn find(&self, filter: Option<Filter>) -> RepositoryResult<Vec<Record>> {
        let filter = filter.unwrap_or_default();
        tracing::trace!("{}: find {:?}", self.model.name, filter);
        Ok(self.data_source.find(&self.model, &filter).await?)
    }

    async fn update_all(&self, data: Record, where_clause: Option<Where>) -> RepositoryResult<u64> {
        Ok(self
            .data_source
            .update_all(&self.model, &data, where_clause.as_ref())
            .await?)
    }

    async fn delete_all(&self, where_clause: Option<Where>) -> RepositoryResult<u64> {
        Ok(self.data_source.delete_all(&self.model, where_clause.as_ref()).await?)
    }

    async fn count(&self, where_clause: Option<Where>) -> RepositoryResult<u64> {
        Ok(self.data_source.count(&self.model, where_clause.as_ref()).await?)
    }
}

#[async_trait]
impl EntityCrudRepository for DataSourceRepository {
    async fn find_by_id(&self, id: &Value) -> RepositoryResult<Option<Record>> {
        Ok(self.data_source.find_by_id(&self.model, id).await?)
    }

    async fn update_by_id(&self, id: &Value, data: Record) -> RepositoryResult<bool> {
        Ok(self.data_source.update_by_id(&self.model, id, &data).await?)
    }

    async fn replace_by_id(&self, id: &Value, data: Record) -> RepositoryResult<bool> {
        Ok(self.data_source.replace_by_id(&self.model, id, &data).await?)
    }

    async fn delete_by_id(&self, id: &Value) -> RepositoryResult<bool> {
        Ok(self.data_source.delete_by_id(&self.model, id).await?)
    }

    async fn exists(&self, id: &Value) -> RepositoryResult<bool> {
        Ok(self.find_by_id(id).await?.is_some())
    }

    async fn save(&self, data: Record) -> RepositoryResult<Record> {
        let id = self
            .model
            .id_name()
            .and_then(|field| data.value_of(field))
            .cloned();

        match id {
            Some(id) if self.exists(&id).await? => {
                self.replace_by_id(&id, data.clone()).await?;
                Ok(data)
            }
            _ => self.create(data).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::MemoryDataSource;
    use crate::model::FieldType;
    use serde_json::json;

    fn repository() -> Arc<dyn EntityCrudRepository> {
        let model = Arc::new(
            ModelDefinition::entity("Product")
                .generated_id("id", FieldType::Integer)
                .field("name", FieldType::String),
        );
        DefaultCrudRepository.bind_entity(model, Arc::new(MemoryDataSource::default()))
    }

    #[tokio::test]
    async fn test_save_creates_then_replaces() {
        let repo = repository();
        let created = repo.save(Record::new().with("name", "pen")).await.unwrap();
        let id = created.get("id").cloned().unwrap();

        repo.save(created.clone().with("name", "ink")).await.unwrap();
        assert_eq!(repo.count(None).await.unwrap(), 1);
        let found = repo.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(found.get("name"), Some(&json!("ink")));
    }

    #[tokio::test]
    async fn test_exists_and_delete() {
        let repo = repository();
        let created = repo.create(Record::new().with("name", "pen")).await.unwrap();
        let id = created.get("id").cloned().unwrap();

        assert!(repo.exists(&id).await.unwrap());
        assert!(repo.delete_by_id(&id).await.unwrap());
        assert!(!repo.exists(&id).await.unwrap());
        assert!(repo.find_by_id(&json!(404)).await.unwrap().is_none());
    }

    #[test]
    fn test_declares_entity_capabilities() {
        assert_eq!(DefaultCrudRepository.capabilities(), CapabilitySet::entity_crud());
        assert_eq!(CrudBase::name(&DefaultCrudRepository), "DefaultCrudRepository");
    }
}
