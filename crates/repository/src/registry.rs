//! Model Registry - Runtime storage of model and entity definitions
//!
//! Definitions are registered once during composition and are immutable
//! afterwards; lookups hand out shared `Arc`s so concurrent readers never
//! block each other.

use std::sync::Arc;

use dashmap::DashMap;

use crate::config::{ConflictPolicy, RepositoryConfig};
use crate::error::{RepositoryError, RepositoryResult};
use crate::model::naming::KeyConvention;
use crate::model::{Model, ModelDefinition};
use crate::relationships::metadata::RelationDefinition;

/// Thread-safe registry of model definitions keyed by model name
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    models: Arc<DashMap<String, Arc<ModelDefinition>>>,
    conflict_policy: ConflictPolicy,
    key_convention: KeyConvention,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new(&RepositoryConfig::default())
    }
}

impl ModelRegistry {
    /// Create an empty registry applying the policies from `config`
    pub fn new(config: &RepositoryConfig) -> Self {
        Self {
            models: Arc::new(DashMap::new()),
            conflict_policy: *config.get_conflict_policy(),
            key_convention: *config.get_key_convention(),
        }
    }

    /// Register a definition, returning the stored (normalized) version
    ///
    /// Relation keys that follow from naming conventions are filled in before
    /// storing. Registering the same shape twice is a no-op.
    pub fn register(&self, definition: ModelDefinition) -> RepositoryResult<Arc<ModelDefinition>> {
        definition.validate()?;
        let definition = Arc::new(self.normalize(definition)?);

        match self.models.entry(definition.name.clone()) {
            dashmap::mapref::entry::Entry::Occupied(mut entry) => {
                if entry.get().as_ref() == definition.as_ref() {
                    return Ok(entry.get().clone());
                }
                match self.conflict_policy {
                    ConflictPolicy::Reject => Err(RepositoryError::DuplicateDefinition {
                        name: definition.name.clone(),
                    }),
                    ConflictPolicy::Replace => {
                        tracing::debug!("Replacing definition of model '{}'", definition.name);
                        entry.insert(definition.clone());
                        Ok(definition)
                    }
                }
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                tracing::debug!(
                    "Registered model '{}' with {} fields and {} relations",
                    definition.name,
                    definition.fields.len(),
                    definition.relations.len()
                );
                entry.insert(definition.clone());
                Ok(definition)
            }
        }
    }

    /// Register a statically described model
    pub fn register_model<M: Model>(&self) -> RepositoryResult<Arc<ModelDefinition>> {
        self.register(M::definition())
    }

    /// Get a definition by name
    pub fn lookup(&self, name: &str) -> RepositoryResult<Arc<ModelDefinition>> {
        self.models
            .get(name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| RepositoryError::UnknownModel(name.to_string()))
    }

    /// Check if a model is registered
    pub fn contains(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    /// All registered model names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.models.iter().map(|entry| entry.key().clone()).collect();
        names.sort();
        names
    }

    /// Relations declared by a model
    pub fn relations_of(&self, name: &str) -> RepositoryResult<Vec<RelationDefinition>> {
        Ok(self.lookup(name)?.relations.clone())
    }

    /// Convention used for implicit foreign keys
    pub fn key_convention(&self) -> KeyConvention {
        self.key_convention
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Apply naming defaults to every relation and reject duplicate accessor names
    fn normalize(&self, mut definition: ModelDefinition) -> RepositoryResult<ModelDefinition> {
        let relations = std::mem::take(&mut definition.relations);
        let mut normalized: Vec<RelationDefinition> = Vec::with_capacity(relations.len());

        for relation in relations {
            relation.validate(&definition.name)?;
            let relation = relation.with_defaults(&definition, self.key_convention);

            if normalized
                .iter()
                .any(|existing| existing.accessor_name() == relation.accessor_name())
            {
                return Err(RepositoryError::invalid_relation(
                    &definition.name,
                    relation.accessor_name(),
                    "relation name is declared twice",
                ));
            }
            normalized.push(relation);
        }

        definition.relations = normalized;
        Ok(definition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FieldType;

    fn product() -> ModelDefinition {
        ModelDefinition::entity("Product")
            .id("id", FieldType::Integer)
            .field("name", FieldType::String)
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = ModelRegistry::default();
        registry.register(product()).unwrap();

        let found = registry.lookup("Product").unwrap();
        assert_eq!(found.name, "Product");
        assert!(registry.contains("Product"));
        assert_eq!(registry.names(), vec!["Product".to_string()]);
    }

    #[test]
    fn test_unknown_model() {
        let registry = ModelRegistry::default();
        assert_eq!(
            registry.lookup("Ghost").unwrap_err(),
            RepositoryError::UnknownModel("Ghost".to_string())
        );
    }

    #[test]
    fn test_identical_registration_is_idempotent() {
        let registry = ModelRegistry::default();
        let first = registry.register(product()).unwrap();
        let second = registry.register(product()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_conflicting_registration_rejected() {
        let registry = ModelRegistry::default();
        registry.register(product()).unwrap();

        let changed = product().field("price", FieldType::Number);
        assert_eq!(
            registry.register(changed).unwrap_err(),
            RepositoryError::DuplicateDefinition { name: "Product".to_string() }
        );
        assert!(!registry.lookup("Product").unwrap().has_field("price"));
    }

    #[test]
    fn test_conflicting_registration_replaced_when_allowed() {
        let config = RepositoryConfig::builder()
            .conflict_policy(ConflictPolicy::Replace)
            .build()
            .unwrap();
        let registry = ModelRegistry::new(&config);
        registry.register(product()).unwrap();
        registry.register(product().field("price", FieldType::Number)).unwrap();

        assert!(registry.lookup("Product").unwrap().has_field("price"));
    }

    #[test]
    fn test_relation_defaults_applied_on_register() {
        let registry = ModelRegistry::default();
        let customer = ModelDefinition::entity("Customer")
            .generated_id("id", FieldType::Integer)
            .field("parentId", FieldType::Integer)
            .relation(RelationDefinition::has_many("orders", "Order"))
            .relation(RelationDefinition::belongs_to("Customer").key_from("parentId"));
        registry.register(customer).unwrap();

        let relations = registry.relations_of("Customer").unwrap();
        assert_eq!(relations[0].key_to.as_deref(), Some("customer_id"));
        assert_eq!(relations[1].name.as_deref(), Some("parent"));
    }

    #[test]
    fn test_duplicate_relation_names_rejected() {
        let registry = ModelRegistry::default();
        let customer = ModelDefinition::entity("Customer")
            .id("id", FieldType::Integer)
            .relation(RelationDefinition::has_many("orders", "Order"))
            .relation(RelationDefinition::has_one("orders", "Order"));
        assert!(matches!(
            registry.register(customer),
            Err(RepositoryError::InvalidRelation { .. })
        ));
    }
}
