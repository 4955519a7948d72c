//! Repository Factory - builds named repository types for registered models
//!
//! A repository type binds one model to one base implementation. Building the
//! type checks the base's capabilities against the construction mode; the
//! type's `construct` then binds a data source and yields a ready instance.

use std::sync::Arc;

use super::capabilities::RepositoryMode;
use super::default_crud::DefaultCrudRepository;
use super::entity::EntityRepository;
use super::instance::{CrudRepositoryInstance, KeyValueRepositoryInstance};
use super::key_value::DefaultKeyValueRepository;
use super::traits::{BaseImplementation, CrudBase, EntityCrudBase, KeyValueBase};
use crate::config::RepositoryConfig;
use crate::datasource::{DataSource, KeyValueDataSource};
use crate::error::{RepositoryError, RepositoryResult};
use crate::model::{repository_name, Model, ModelDefinition};
use crate::registry::ModelRegistry;
use crate::relationships::RelationResolver;

/// Builds repository types from the registry
#[derive(Debug, Clone)]
pub struct RepositoryFactory {
    registry: Arc<ModelRegistry>,
    config: Arc<RepositoryConfig>,
}

impl RepositoryFactory {
    pub fn new(registry: Arc<ModelRegistry>, config: RepositoryConfig) -> Self {
        Self {
            registry,
            config: Arc::new(config),
        }
    }

    /// Factory over a fresh registry sharing the same configuration
    pub fn with_config(config: RepositoryConfig) -> Self {
        let registry = Arc::new(ModelRegistry::new(&config));
        Self::new(registry, config)
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    /// Repository type for a plain model (or an entity used without its id operations)
    pub fn crud_repository_type(
        &self,
        model: &str,
        base: Option<BaseImplementation>,
    ) -> RepositoryResult<CrudRepositoryType> {
        let model = self.registry.lookup(model)?;
        let base = base.unwrap_or_else(|| BaseImplementation::entity_crud(DefaultCrudRepository));
        let mode = RepositoryMode::Crud;
        ensure_capabilities(&model, mode, &base)?;

        let binding = match base {
            BaseImplementation::Crud(base) => CrudBinding::Crud(base),
            BaseImplementation::EntityCrud(base) => CrudBinding::Entity(base),
            other @ BaseImplementation::KeyValue(_) => return Err(invalid_base(&model, mode, &other)),
        };

        let repository_type = CrudRepositoryType {
            name: repository_name(&model.name),
            model,
            binding,
        };
        log_defined(&repository_type.name, mode, repository_type.base_name());
        Ok(repository_type)
    }

    /// Repository type for an entity, with id operations and relation accessors
    pub fn entity_repository_type(
        &self,
        model: &str,
        base: Option<BaseImplementation>,
    ) -> RepositoryResult<EntityRepositoryType> {
        let model = self.registry.lookup(model)?;
        if !model.is_entity() {
            return Err(RepositoryError::invalid_definition(
                &model.name,
                "entity repositories require an entity with an id field",
            ));
        }
        let base = base.unwrap_or_else(|| BaseImplementation::entity_crud(DefaultCrudRepository));
        let mode = RepositoryMode::EntityCrud;
        ensure_capabilities(&model, mode, &base)?;

        let base = match base {
            BaseImplementation::EntityCrud(base) => base,
            other => return Err(invalid_base(&model, mode, &other)),
        };

        let repository_type = EntityRepositoryType {
            name: repository_name(&model.name),
            model,
            base,
            resolver: RelationResolver::new(self.registry.clone()),
            config: self.config.clone(),
        };
        log_defined(&repository_type.name, mode, repository_type.base_name());
        Ok(repository_type)
    }

    /// Repository type for a key-value store
    pub fn key_value_repository_type(
        &self,
        model: &str,
        base: Option<BaseImplementation>,
    ) -> RepositoryResult<KeyValueRepositoryType> {
        let model = self.registry.lookup(model)?;
        let base = base.unwrap_or_else(|| {
            BaseImplementation::key_value(DefaultKeyValueRepository::with_default_ttl(
                *self.config.get_key_value_default_ttl(),
            ))
        });
        let mode = RepositoryMode::KeyValue;
        ensure_capabilities(&model, mode, &base)?;

        let base = match base {
            BaseImplementation::KeyValue(base) => base,
            other => return Err(invalid_base(&model, mode, &other)),
        };

        let repository_type = KeyValueRepositoryType {
            name: repository_name(&model.name),
            model,
            base,
        };
        log_defined(&repository_type.name, mode, repository_type.base_name());
        Ok(repository_type)
    }

    /// `crud_repository_type` for a statically described model, registering it if needed
    pub fn crud_repository_type_for<M: Model>(
        &self,
        base: Option<BaseImplementation>,
    ) -> RepositoryResult<CrudRepositoryType> {
        let model = self.registry.register_model::<M>()?;
        self.crud_repository_type(&model.name, base)
    }

    pub fn entity_repository_type_for<M: Model>(
        &self,
        base: Option<BaseImplementation>,
    ) -> RepositoryResult<EntityRepositoryType> {
        let model = self.registry.register_model::<M>()?;
        self.entity_repository_type(&model.name, base)
    }

    pub fn key_value_repository_type_for<M: Model>(
        &self,
        base: Option<BaseImplementation>,
    ) -> RepositoryResult<KeyValueRepositoryType> {
        let model = self.registry.register_model::<M>()?;
        self.key_value_repository_type(&model.name, base)
    }
}

fn ensure_capabilities(
    model: &ModelDefinition,
    mode: RepositoryMode,
    base: &BaseImplementation,
) -> RepositoryResult<()> {
    if base.effective_capabilities().missing(&mode.required()).is_empty() {
        Ok(())
    } else {
        Err(invalid_base(model, mode, base))
    }
}

fn invalid_base(model: &ModelDefinition, mode: RepositoryMode, base: &BaseImplementation) -> RepositoryError {
    let missing = base
        .effective_capabilities()
        .missing(&mode.required())
        .into_iter()
        .map(|capability| capability.to_string())
        .collect();
    RepositoryError::InvalidBaseImplementation {
        repository: repository_name(&model.name),
        base: base.name().to_string(),
        mode: mode.to_string(),
        missing,
    }
}

fn log_defined(name: &str, mode: RepositoryMode, base: &str) {
    tracing::debug!("Defined {} ({} mode, base {})", name, mode, base);
}

enum CrudBinding {
    Crud(Arc<dyn CrudBase>),
    Entity(Arc<dyn EntityCrudBase>),
}

/// Repository type for the CRUD mode
pub struct CrudRepositoryType {
    name: String,
    model: Arc<ModelDefinition>,
    binding: CrudBinding,
}

impl CrudRepositoryType {
    /// `<Model>Repository`
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model(&self) -> &Arc<ModelDefinition> {
        &self.model
    }

    pub fn base_name(&self) -> &str {
        match &self.binding {
            CrudBinding::Crud(base) => base.name(),
            CrudBinding::Entity(base) => base.name(),
        }
    }

    pub fn mode(&self) -> RepositoryMode {
        RepositoryMode::Crud
    }

    pub fn construct(&self, data_source: Arc<dyn DataSource>) -> CrudRepositoryInstance {
        tracing::debug!("Constructing {} on data source '{}'", self.name, data_source.name());
        let inner = match &self.binding {
            CrudBinding::Crud(base) => base.bind(self.model.clone(), data_source),
            CrudBinding::Entity(base) => base.bind(self.model.clone(), data_source),
        };
        CrudRepositoryInstance::new(self.name.clone(), inner)
    }
}

/// Repository type for the entity CRUD mode
pub struct EntityRepositoryType {
    name: String,
    model: Arc<ModelDefinition>,
    base: Arc<dyn EntityCrudBase>,
    resolver: RelationResolver,
    config: Arc<RepositoryConfig>,
}

impl EntityRepositoryType {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model(&self) -> &Arc<ModelDefinition> {
        &self.model
    }

    pub fn base_name(&self) -> &str {
        self.base.name()
    }

    pub fn mode(&self) -> RepositoryMode {
        RepositoryMode::EntityCrud
    }

    /// Resolve every declared relation now instead of on first use
    pub fn check_relations(&self) -> RepositoryResult<()> {
        for relation in &self.model.relations {
            self.resolver.resolve(&self.model, relation)?;
        }
        Ok(())
    }

    pub fn construct(&self, data_source: Arc<dyn DataSource>) -> EntityRepository {
        tracing::debug!("Constructing {} on data source '{}'", self.name, data_source.name());
        EntityRepository::new(
            self.name.clone(),
            self.model.clone(),
            self.base.clone(),
            data_source,
            self.resolver.clone(),
            *self.config.get_has_one_policy(),
        )
    }
}

/// Repository type for the key-value mode
pub struct KeyValueRepositoryType {
    name: String,
    model: Arc<ModelDefinition>,
    base: Arc<dyn KeyValueBase>,
}

impl KeyValueRepositoryType {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model(&self) -> &Arc<ModelDefinition> {
        &self.model
    }

    pub fn base_name(&self) -> &str {
        self.base.name()
    }

    pub fn mode(&self) -> RepositoryMode {
        RepositoryMode::KeyValue
    }

    pub fn construct(&self, data_source: Arc<dyn KeyValueDataSource>) -> KeyValueRepositoryInstance {
        tracing::debug!("Constructing {} on data source '{}'", self.name, data_source.name());
        KeyValueRepositoryInstance::new(self.name.clone(), self.base.bind(self.model.clone(), data_source))
    }
}

impl std::fmt::Debug for CrudRepositoryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrudRepositoryType")
            .field("name", &self.name)
            .field("base", &self.base_name())
            .finish()
    }
}

impl std::fmt::Debug for EntityRepositoryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityRepositoryType")
            .field("name", &self.name)
            .field("base", &self.base_name())
            .finish()
    }
}

impl std::fmt::Debug for KeyValueRepositoryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyValueRepositoryType")
            .field("name", &self.name)
            .field("base", &self.base_name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::MemoryDataSource;
    use crate::model::FieldType;
    use crate::repository::capabilities::{Capability, CapabilitySet};
    use crate::repository::traits::{CrudRepository, EntityCrudRepository};

    /// Entity base that cannot delete by id
    struct NoDeleteBase;

    impl CrudBase for NoDeleteBase {
        fn name(&self) -> &str {
            "NoDeleteBase"
        }

        fn capabilities(&self) -> CapabilitySet {
            CapabilitySet::entity_crud().without(Capability::DeleteById)
        }

        fn bind(&self, model: Arc<ModelDefinition>, data_source: Arc<dyn DataSource>) -> Arc<dyn CrudRepository> {
            DefaultCrudRepository.bind(model, data_source)
        }
    }

    impl EntityCrudBase for NoDeleteBase {
        fn bind_entity(
            &self,
            model: Arc<ModelDefinition>,
            data_source: Arc<dyn DataSource>,
        ) -> Arc<dyn EntityCrudRepository> {
            DefaultCrudRepository.bind_entity(model, data_source)
        }
    }

    fn factory() -> RepositoryFactory {
        let factory = RepositoryFactory::with_config(RepositoryConfig::default());
        factory
            .registry()
            .register(ModelDefinition::entity("Product").generated_id("id", FieldType::Integer))
            .unwrap();
        factory
            .registry()
            .register(ModelDefinition::model("Address").field("city", FieldType::String))
            .unwrap();
        factory
    }

    #[test]
    fn test_every_mode_names_the_type_after_the_model() {
        let factory = factory();
        assert_eq!(factory.crud_repository_type("Address", None).unwrap().name(), "AddressRepository");
        assert_eq!(factory.entity_repository_type("Product", None).unwrap().name(), "ProductRepository");
        assert_eq!(
            factory.key_value_repository_type("Product", None).unwrap().name(),
            "ProductRepository"
        );
    }

    #[test]
    fn test_default_bases() {
        let factory = factory();
        let entity = factory.entity_repository_type("Product", None).unwrap();
        assert_eq!(entity.base_name(), "DefaultCrudRepository");
        assert_eq!(entity.mode(), RepositoryMode::EntityCrud);

        let kv = factory.key_value_repository_type("Product", None).unwrap();
        assert_eq!(kv.base_name(), "DefaultKeyValueRepository");
    }

    #[test]
    fn test_base_missing_capability_is_rejected() {
        let factory = factory();
        let err = factory
            .entity_repository_type("Product", Some(BaseImplementation::entity_crud(NoDeleteBase)))
            .unwrap_err();
        assert_eq!(
            err,
            RepositoryError::InvalidBaseImplementation {
                repository: "ProductRepository".to_string(),
                base: "NoDeleteBase".to_string(),
                mode: "entity-crud".to_string(),
                missing: vec!["deleteById".to_string()],
            }
        );

        // the same base is enough for plain CRUD
        let crud = factory
            .crud_repository_type("Address", Some(BaseImplementation::entity_crud(NoDeleteBase)))
            .unwrap();
        assert_eq!(crud.base_name(), "NoDeleteBase");
    }

    #[test]
    fn test_key_value_base_cannot_back_crud() {
        let factory = factory();
        let err = factory
            .crud_repository_type("Address", Some(BaseImplementation::key_value(DefaultKeyValueRepository::new())))
            .unwrap_err();
        match err {
            RepositoryError::InvalidBaseImplementation { missing, .. } => {
                assert!(missing.contains(&"create".to_string()));
                assert!(!missing.contains(&"deleteAll".to_string()));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_entity_mode_requires_entity() {
        let factory = factory();
        assert!(matches!(
            factory.entity_repository_type("Address", None),
            Err(RepositoryError::InvalidDefinition { .. })
        ));
        assert_eq!(
            factory.crud_repository_type("Ghost", None).unwrap_err(),
            RepositoryError::UnknownModel("Ghost".to_string())
        );
    }

    #[tokio::test]
    async fn test_crud_instance_round_trip() {
        let factory = factory();
        let addresses = factory
            .crud_repository_type("Address", None)
            .unwrap()
            .construct(Arc::new(MemoryDataSource::default()));

        addresses
            .create_all(vec![
                crate::model::Record::new().with("city", "Oslo"),
                crate::model::Record::new().with("city", "Bergen"),
            ])
            .await
            .unwrap();
        assert_eq!(addresses.name(), "AddressRepository");
        assert_eq!(addresses.count(None).await.unwrap(), 2);
        assert_eq!(
            addresses
                .delete_all(Some(crate::filter::Where::eq("city", "Oslo")))
                .await
                .unwrap(),
            1
        );
    }
}
