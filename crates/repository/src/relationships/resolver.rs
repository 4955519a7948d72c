//! Relation Resolver - validates declarations against the registry
//!
//! Resolution turns a `RelationDefinition` with optional keys into a
//! `ResolvedRelation` whose keys, target and join definitions are all concrete.

use std::sync::Arc;

use serde_json::Value;

use super::metadata::{RelationDefinition, RelationKind};
use crate::error::{RepositoryError, RepositoryResult};
use crate::filter::values_equal;
use crate::model::{ModelDefinition, Record};
use crate::registry::ModelRegistry;

/// Join entity of a resolved hasMany-through relation
#[derive(Debug, Clone)]
pub struct ResolvedThrough {
    pub model: Arc<ModelDefinition>,
    /// Key on the join entity referencing the owner
    pub key_from: String,
    /// Key on the join entity referencing the target
    pub key_to: String,
}

/// A relation with every key and model resolved
#[derive(Debug, Clone)]
pub struct ResolvedRelation {
    pub kind: RelationKind,
    pub name: String,
    pub owner: Arc<ModelDefinition>,
    pub target: Arc<ModelDefinition>,
    /// Key on the owner: the foreign key for belongsTo, the referenced key otherwise
    pub key_from: String,
    /// Key on the target: the referenced key for belongsTo, the foreign key for hasOne/hasMany
    pub key_to: String,
    pub through: Option<ResolvedThrough>,
}

impl ResolvedRelation {
    /// Value of `key_from` on an owner record
    pub fn owner_key(&self, owner: &Record) -> RepositoryResult<Value> {
        owner
            .value_of(&self.key_from)
            .cloned()
            .ok_or_else(|| RepositoryError::MissingIdentifier {
                model: self.owner.name.clone(),
                key: self.key_from.clone(),
            })
    }

    /// Check that `data` does not point `property` anywhere but `expected`, then optionally pin it
    pub(crate) fn enforce_key(
        &self,
        model: &ModelDefinition,
        data: &mut Record,
        property: &str,
        expected: &Value,
        assign: bool,
    ) -> RepositoryResult<()> {
        if let Some(actual) = data.value_of(property) {
            if !values_equal(actual, expected) {
                return Err(RepositoryError::RelationConstraint {
                    model: model.name.clone(),
                    relation: self.name.clone(),
                    property: property.to_string(),
                    expected: expected.clone(),
                });
            }
        }
        if assign {
            data.set(property, expected.clone());
        }
        Ok(())
    }

    /// Whether `key_to` is the target's id field
    pub fn targets_id(&self) -> bool {
        self.target.id_name() == Some(self.key_to.as_str())
    }
}

/// Resolves relation declarations of registered entities
#[derive(Debug, Clone)]
pub struct RelationResolver {
    registry: Arc<ModelRegistry>,
}

impl RelationResolver {
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self { registry }
    }

    /// Resolve the relation declared on `owner` under `name`
    pub fn resolve_named(&self, owner: &Arc<ModelDefinition>, name: &str) -> RepositoryResult<ResolvedRelation> {
        let relation = owner
            .relations
            .iter()
            .find(|relation| relation.accessor_name() == name)
            .ok_or_else(|| RepositoryError::UnknownRelation {
                model: owner.name.clone(),
                relation: name.to_string(),
            })?;
        self.resolve(owner, relation)
    }

    /// Resolve a single declaration against the registry
    pub fn resolve(
        &self,
        owner: &Arc<ModelDefinition>,
        relation: &RelationDefinition,
    ) -> RepositoryResult<ResolvedRelation> {
        let relation = relation
            .clone()
            .with_defaults(owner, self.registry.key_convention());
        let name = relation.accessor_name().to_string();
        let invalid = |reason: String| RepositoryError::invalid_relation(&owner.name, &name, reason);

        let target = self.registry.lookup(&relation.target)?;
        let target_id = target
            .id_name()
            .filter(|_| target.is_entity())
            .ok_or_else(|| invalid(format!("target '{}' is not an entity", target.name)))?
            .to_string();

        let resolved = match relation.kind {
            RelationKind::BelongsTo => {
                let key_from = relation
                    .key_from
                    .clone()
                    .ok_or_else(|| invalid("foreign key is not set".to_string()))?;
                let key_to = relation.key_to.clone().unwrap_or(target_id);
                let referenced = target.get_field(&key_to).ok_or_else(|| {
                    invalid(format!("target '{}' has no field '{}'", target.name, key_to))
                })?;
                if let Some(foreign) = owner.get_field(&key_from) {
                    if !foreign.field_type.is_compatible_with(referenced.field_type) {
                        return Err(invalid(format!(
                            "foreign key '{}' is {} but '{}.{}' is {}",
                            key_from, foreign.field_type, target.name, key_to, referenced.field_type
                        )));
                    }
                }
                ResolvedRelation {
                    kind: relation.kind,
                    name,
                    owner: owner.clone(),
                    target,
                    key_from,
                    key_to,
                    through: None,
                }
            }
            RelationKind::HasOne | RelationKind::HasMany => {
                let key_from = self.owner_key_field(owner, &relation, &invalid)?;
                let key_to = relation
                    .key_to
                    .clone()
                    .ok_or_else(|| invalid("foreign key is not set".to_string()))?;
                if !target.has_field(&key_to) {
                    return Err(invalid(format!(
                        "target '{}' does not declare foreign key '{}'",
                        target.name, key_to
                    )));
                }
                ResolvedRelation {
                    kind: relation.kind,
                    name,
                    owner: owner.clone(),
                    target,
                    key_from,
                    key_to,
                    through: None,
                }
            }
            RelationKind::HasManyThrough => {
                let key_from = self.owner_key_field(owner, &relation, &invalid)?;
                let key_to = relation.key_to.clone().unwrap_or(target_id);
                if !target.has_field(&key_to) {
                    return Err(invalid(format!("target '{}' has no field '{}'", target.name, key_to)));
                }
                let declared = relation
                    .through
                    .as_ref()
                    .ok_or_else(|| invalid("join model is not set".to_string()))?;
                let join = self.registry.lookup(&declared.model)?;
                if !join.is_entity() {
                    return Err(invalid(format!("join model '{}' is not an entity", join.name)));
                }
                let join_key = |key: &Option<String>| -> RepositoryResult<String> {
                    let key = key
                        .clone()
                        .ok_or_else(|| invalid("join model keys are not set".to_string()))?;
                    if !join.has_field(&key) {
                        return Err(invalid(format!(
                            "join model '{}' does not declare foreign key '{}'",
                            join.name, key
                        )));
                    }
                    Ok(key)
                };
                let through_key_from = join_key(&declared.key_from)?;
                let through_key_to = join_key(&declared.key_to)?;
                ResolvedRelation {
                    kind: relation.kind,
                    name,
                    owner: owner.clone(),
                    target,
                    key_from,
                    key_to,
                    through: Some(ResolvedThrough {
                        model: join,
                        key_from: through_key_from,
                        key_to: through_key_to,
                    }),
                }
            }
        };

        tracing::debug!(
            "Resolved {} relation {}.{} -> {} ({} -> {})",
            resolved.kind,
            resolved.owner.name,
            resolved.name,
            resolved.target.name,
            resolved.key_from,
            resolved.key_to
        );
        Ok(resolved)
    }

    /// Referenced key on the owner; defaults to the owner's id
    fn owner_key_field(
        &self,
        owner: &ModelDefinition,
        relation: &RelationDefinition,
        invalid: &dyn Fn(String) -> RepositoryError,
    ) -> RepositoryResult<String> {
        let key = relation
            .key_from
            .clone()
            .or_else(|| owner.id_name().map(str::to_string))
            .ok_or_else(|| invalid(format!("owner '{}' has no id field", owner.name)))?;
        if !owner.has_field(&key) {
            return Err(invalid(format!("owner '{}' has no field '{}'", owner.name, key)));
        }
        Ok(key)
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FieldType;

    fn registry() -> Arc<ModelRegistry> {
        let registry = ModelRegistry::default();
        registry
            .register(
                ModelDefinition::entity("Customer")
                    .generated_id("id", FieldType::Integer)
                    .field("parent_id", FieldType::Integer)
                    .relation(RelationDefinition::has_many("orders", "Order"))
                    .relation(RelationDefinition::belongs_to("Customer").key_from("parent_id"))
                    .relation(RelationDefinition::has_many_through("sellers", "Seller", "Order")),
            )
            .unwrap();
        registry
            .register(
                ModelDefinition::entity("Order")
                    .generated_id("id", FieldType::Integer)
                    .field("customer_id", FieldType::Integer)
                    .field("seller_id", FieldType::Integer),
            )
            .unwrap();
        registry
            .register(ModelDefinition::entity("Seller").generated_id("id", FieldType::Integer))
            .unwrap();
        Arc::new(registry)
    }

    #[test]
    fn test_resolves_conventional_keys() {
        let registry = registry();
        let resolver = RelationResolver::new(registry.clone());
        let customer = registry.lookup("Customer").unwrap();

        let orders = resolver.resolve_named(&customer, "orders").unwrap();
        assert_eq!(orders.key_from, "id");
        assert_eq!(orders.key_to, "customer_id");

        let parent = resolver.resolve_named(&customer, "parent").unwrap();
        assert_eq!(parent.kind, RelationKind::BelongsTo);
        assert_eq!(parent.key_from, "parent_id");
        assert!(parent.targets_id());

        let sellers = resolver.resolve_named(&customer, "sellers").unwrap();
        let through = sellers.through.unwrap();
        assert_eq!(through.model.name, "Order");
        assert_eq!(through.key_from, "customer_id");
        assert_eq!(through.key_to, "seller_id");
    }

    #[test]
    fn test_unknown_relation_and_target() {
        let registry = registry();
        let resolver = RelationResolver::new(registry.clone());
        let customer = registry.lookup("Customer").unwrap();

        assert!(matches!(
            resolver.resolve_named(&customer, "wishlist"),
            Err(RepositoryError::UnknownRelation { .. })
        ));

        let dangling = RelationDefinition::has_many("reviews", "Review");
        assert_eq!(
            resolver.resolve(&customer, &dangling).unwrap_err(),
            RepositoryError::UnknownModel("Review".to_string())
        );
    }

    #[test]
    fn test_missing_foreign_key_on_target() {
        let registry = registry();
        let resolver = RelationResolver::new(registry.clone());
        let seller = registry.lookup("Seller").unwrap();

        let orders = RelationDefinition::has_many("orders", "Order").key_to("vendor_id");
        assert!(matches!(
            resolver.resolve(&seller, &orders),
            Err(RepositoryError::InvalidRelation { .. })
        ));
    }

    #[test]
    fn test_incompatible_foreign_key_type() {
        let registry = registry();
        registry
            .register(
                ModelDefinition::entity("Invoice")
                    .generated_id("id", FieldType::Integer)
                    .field("customer_id", FieldType::Boolean)
                    .relation(RelationDefinition::belongs_to("Customer")),
            )
            .unwrap();
        let resolver = RelationResolver::new(registry.clone());
        let invoice = registry.lookup("Invoice").unwrap();

        let err = resolver.resolve_named(&invoice, "customer").unwrap_err();
        assert!(err.to_string().contains("boolean"));
    }

    #[test]
    fn test_owner_key_and_constraints() {
        let registry = registry();
        let resolver = RelationResolver::new(registry.clone());
        let customer = registry.lookup("Customer").unwrap();
        let orders = resolver.resolve_named(&customer, "orders").unwrap();

        assert!(matches!(
            orders.owner_key(&Record::new()),
            Err(RepositoryError::MissingIdentifier { .. })
        ));

        let owner_id = Value::from(1);
        let mut data = Record::new().with("customer_id", 2);
        assert!(matches!(
            orders.enforce_key(&orders.target, &mut data, "customer_id", &owner_id, true),
            Err(RepositoryError::RelationConstraint { .. })
        ));

        let mut data = Record::new();
        orders
            .enforce_key(&orders.target, &mut data, "customer_id", &owner_id, true)
            .unwrap();
        assert_eq!(data.get("customer_id"), Some(&owner_id));
    }
}
