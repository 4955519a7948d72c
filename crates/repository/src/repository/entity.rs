//! Entity repositories - CRUD by id plus named relation accessors

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

use super::traits::{CrudRepository, EntityCrudBase, EntityCrudRepository};
use crate::config::HasOnePolicy;
use crate::datasource::DataSource;
use crate::error::{RepositoryError, RepositoryResult};
use crate::filter::{Filter, Where};
use crate::model::{ModelDefinition, Record};
use crate::relationships::{
    BelongsToAccessor, HasManyFactory, HasManyThroughFactory, HasOneFactory, RelationAccessor,
    RelationKind, RelationResolver,
};

/// Entity repository bound to one data source
///
/// Relation accessors are resolved the first time their name is used and
/// cached for the lifetime of the instance. Repositories for targets and join
/// models are bound from the same base onto the same data source.
pub struct EntityRepository {
    name: String,
    inner: Arc<dyn EntityCrudRepository>,
    base: Arc<dyn EntityCrudBase>,
    data_source: Arc<dyn DataSource>,
    resolver: RelationResolver,
    has_one_policy: HasOnePolicy,
    accessors: DashMap<String, RelationAccessor>,
}

impl EntityRepository {
    pub(crate) fn new(
        name: String,
        model: Arc<ModelDefinition>,
        base: Arc<dyn EntityCrudBase>,
        data_source: Arc<dyn DataSource>,
        resolver: RelationResolver,
        has_one_policy: HasOnePolicy,
    ) -> Self {
        let inner = base.bind_entity(model, data_source.clone());
        Self {
            name,
            inner,
            base,
            data_source,
            resolver,
            has_one_policy,
            accessors: DashMap::new(),
        }
    }

    /// Repository type name, `<Model>Repository`
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_source(&self) -> &Arc<dyn DataSource> {
        &self.data_source
    }

    /// Names of the relations declared on the model
    pub fn relation_names(&self) -> Vec<&str> {
        self.inner
            .model()
            .relations
            .iter()
            .map(|relation| relation.accessor_name())
            .collect()
    }

    /// Accessor for the relation declared under `name`
    pub fn relation(&self, name: &str) -> RepositoryResult<RelationAccessor> {
        if let Some(accessor) = self.accessors.get(name) {
            return Ok(accessor.value().clone());
        }

        let accessor = self.build_accessor(name)?;
        tracing::debug!(
            "Created {} accessor '{}' on {}",
            accessor.kind(),
            name,
            self.name
        );
        Ok(self
            .accessors
            .entry(name.to_string())
            .or_insert(accessor)
            .value()
            .clone())
    }

    pub fn belongs_to(&self, name: &str) -> RepositoryResult<Arc<BelongsToAccessor>> {
        match self.relation(name)? {
            RelationAccessor::BelongsTo(accessor) => Ok(accessor),
            other => Err(kind_mismatch(&other, RelationKind::BelongsTo)),
        }
    }

    pub fn has_one(&self, name: &str) -> RepositoryResult<Arc<HasOneFactory>> {
        match self.relation(name)? {
            RelationAccessor::HasOne(factory) => Ok(factory),
            other => Err(kind_mismatch(&other, RelationKind::HasOne)),
        }
    }

    pub fn has_many(&self, name: &str) -> RepositoryResult<Arc<HasManyFactory>> {
        match self.relation(name)? {
            RelationAccessor::HasMany(factory) => Ok(factory),
            other => Err(kind_mismatch(&other, RelationKind::HasMany)),
        }
    }

    pub fn has_many_through(&self, name: &str) -> RepositoryResult<Arc<HasManyThroughFactory>> {
        match self.relation(name)? {
            RelationAccessor::HasManyThrough(factory) => Ok(factory),
            other => Err(kind_mismatch(&other, RelationKind::HasManyThrough)),
        }
    }

    fn build_accessor(&self, name: &str) -> RepositoryResult<RelationAccessor> {
        let relation = Arc::new(self.resolver.resolve_named(self.inner.model(), name)?);
        let target = self
            .base
            .bind_entity(relation.target.clone(), self.data_source.clone());

        Ok(match relation.kind {
            RelationKind::BelongsTo => RelationAccessor::BelongsTo(Arc::new(BelongsToAccessor::new(
                relation,
                self.inner.clone(),
                target,
            ))),
            RelationKind::HasOne => RelationAccessor::HasOne(Arc::new(HasOneFactory::new(
                relation,
                target,
                self.has_one_policy,
            ))),
            RelationKind::HasMany => {
                RelationAccessor::HasMany(Arc::new(HasManyFactory::new(relation, target)))
            }
            RelationKind::HasManyThrough => {
                let join_model = relation
                    .through
                    .as_ref()
                    .map(|through| through.model.clone())
                    .ok_or_else(|| {
                        RepositoryError::invalid_relation(&self.name, name, "join model is not set")
                    })?;
                let join = self.base.bind_entity(join_model, self.data_source.clone());
                RelationAccessor::HasManyThrough(Arc::new(HasManyThroughFactory::new(
                    relation, target, join,
                )))
            }
        })
    }
}

fn kind_mismatch(accessor: &RelationAccessor, requested: RelationKind) -> RepositoryError {
    RepositoryError::RelationKindMismatch {
        relation: accessor.name().to_string(),
        actual: accessor.kind().to_string(),
        requested: requested.to_string(),
    }
}

#[async_trait]
impl CrudRepository for EntityRepository {
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

#[async_trait]
impl EntityCrudRepository for EntityRepository {
    async fn find_by_id(&self, id: &Value) -> RepositoryResult<Option<Record>> {
        self.inner.find_by_id(id).await
    }

    async fn update_by_id(&self, id: &Value, data: Record) -> RepositoryResult<bool> {
        self.inner.update_by_id(id, data).await
    }

    async fn replace_by_id(&self, id: &Value, data: Record) -> RepositoryResult<bool> {
        self.inner.replace_by_id(id, data).await
    }

    async fn delete_by_id(&self, id: &Value) -> RepositoryResult<bool> {
        self.inner.delete_by_id(id).await
    }

    async fn exists(&self, id: &Value) -> RepositoryResult<bool> {
        self.inner.exists(id).await
    }

    async fn save(&self, data: Record) -> RepositoryResult<Record> {
        self.inner.save(data).await
    }
}

impl std::fmt::Debug for EntityRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityRepository")
            .field("name", &self.name)
            .field("base", &self.base.name())
            .field("data_source", &self.data_source.name())
            .field("cached_accessors", &self.accessors.len())
            .finish()
    }
}
