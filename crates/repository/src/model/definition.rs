//! Model Definitions - Static description of models, entities and their fields
//!
//! A `ModelDefinition` replaces decorator metadata: fields, the id field and
//! relation declarations are enumerated explicitly with a builder and handed
//! to the registry at composition time.

use serde::{Deserialize, Serialize};

use crate::error::{RepositoryError, RepositoryResult};
use crate::relationships::metadata::RelationDefinition;

/// Field types understood by the repository layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Integer,
    Boolean,
    Date,
    Object,
    Array,
    Any,
}

impl FieldType {
    /// Whether a foreign key of this type can hold an id of type `other`
    pub fn is_compatible_with(self, other: FieldType) -> bool {
        match (self, other) {
            (a, b) if a == b => true,
            (FieldType::Any, _) | (_, FieldType::Any) => true,
            (FieldType::Number, FieldType::Integer) | (FieldType::Integer, FieldType::Number) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Integer => "integer",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::Object => "object",
            FieldType::Array => "array",
            FieldType::Any => "any",
        };
        write!(f, "{}", name)
    }
}

/// A single field of a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    pub field_type: FieldType,
    pub required: bool,
    /// Marks the identifier field of an entity
    pub id: bool,
    /// Identifier values are assigned by the data source when absent
    pub generated: bool,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: false,
            id: false,
            generated: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Distinguishes plain value models from entities with identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelKind {
    Model,
    Entity,
}

/// Complete description of a model: name, fields and relation declarations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDefinition {
    pub name: String,
    pub kind: ModelKind,
    pub fields: Vec<FieldDefinition>,
    pub relations: Vec<RelationDefinition>,
}

impl ModelDefinition {
    /// Start a plain model definition (no identity, no relations)
    pub fn model(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ModelKind::Model,
            fields: Vec::new(),
            relations: Vec::new(),
        }
    }

    /// Start an entity definition; an id field must be added with `id` or `generated_id`
    pub fn entity(name: impl Into<String>) -> Self {
        Self {
            kind: ModelKind::Entity,
            ..Self::model(name)
        }
    }

    /// Add a regular field
    pub fn field(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.fields.push(FieldDefinition::new(name, field_type));
        self
    }

    /// Add a required field
    pub fn required_field(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.fields.push(FieldDefinition::new(name, field_type).required());
        self
    }

    /// Add the identifier field; values must be supplied by the caller
    pub fn id(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        let mut field = FieldDefinition::new(name, field_type);
        field.id = true;
        self.fields.push(field);
        self
    }

    /// Add an identifier field whose values the data source generates
    pub fn generated_id(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        let mut field = FieldDefinition::new(name, field_type);
        field.id = true;
        field.generated = true;
        self.fields.push(field);
        self
    }

    /// Declare a relation owned by this model
    pub fn relation(mut self, relation: RelationDefinition) -> Self {
        self.relations.push(relation);
        self
    }

    pub fn is_entity(&self) -> bool {
        self.kind == ModelKind::Entity
    }

    /// The identifier field, if this is an entity
    pub fn id_field(&self) -> Option<&FieldDefinition> {
        self.fields.iter().find(|field| field.id)
    }

    /// Name of the identifier field
    pub fn id_name(&self) -> Option<&str> {
        self.id_field().map(|field| field.name.as_str())
    }

    pub fn get_field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.get_field(name).is_some()
    }

    /// Relation declared under `name`; belongsTo names may still be implicit here
    pub fn get_relation(&self, name: &str) -> Option<&RelationDefinition> {
        self.relations
            .iter()
            .find(|relation| relation.name.as_deref() == Some(name))
    }

    /// Check structural invariants that do not depend on other models
    pub fn validate(&self) -> RepositoryResult<()> {
        if self.name.trim().is_empty() {
            return Err(RepositoryError::invalid_definition(
                &self.name,
                "model name cannot be empty",
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(RepositoryError::invalid_definition(
                    &self.name,
                    format!("field '{}' is declared twice", field.name),
                ));
            }
        }

        let id_count = self.fields.iter().filter(|field| field.id).count();
        match self.kind {
            ModelKind::Entity if id_count != 1 => Err(RepositoryError::invalid_definition(
                &self.name,
                format!("an entity needs exactly one id field, found {}", id_count),
            )),
            ModelKind::Model if id_count > 0 => Err(RepositoryError::invalid_definition(
                &self.name,
                "plain models have no identity; declare it as an entity",
            )),
            ModelKind::Model if !self.relations.is_empty() => Err(
                RepositoryError::invalid_definition(&self.name, "only entities can declare relations"),
            ),
            _ => Ok(()),
        }
    }
}

/// Statically described model types
///
/// Implemented by application structs so repositories can be defined from the
/// type alone; records convert to and from the struct through serde.
pub trait Model: Serialize + serde::de::DeserializeOwned + Send + Sync {
    fn definition() -> ModelDefinition;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_requires_single_id() {
        let missing = ModelDefinition::entity("Product").field("name", FieldType::String);
        assert!(matches!(
            missing.validate(),
            Err(RepositoryError::InvalidDefinition { .. })
        ));

        let twice = ModelDefinition::entity("Product")
            .id("id", FieldType::Integer)
            .id("sku", FieldType::String);
        assert!(twice.validate().is_err());

        let valid = ModelDefinition::entity("Product").id("id", FieldType::Integer);
        assert!(valid.validate().is_ok());
        assert_eq!(valid.id_name(), Some("id"));
    }

    #[test]
    fn test_plain_model_has_no_identity() {
        let address = ModelDefinition::model("Address")
            .field("street", FieldType::String)
            .field("city", FieldType::String);
        assert!(address.validate().is_ok());
        assert!(address.id_field().is_none());
        assert!(!address.is_entity());

        let with_id = ModelDefinition::model("Address").id("id", FieldType::Integer);
        assert!(with_id.validate().is_err());
    }

    #[test]
    fn test_duplicate_field_names_rejected() {
        let definition = ModelDefinition::model("Address")
            .field("city", FieldType::String)
            .field("city", FieldType::String);
        assert!(definition.validate().is_err());
    }

    #[test]
    fn test_field_type_compatibility() {
        assert!(FieldType::Integer.is_compatible_with(FieldType::Number));
        assert!(FieldType::Any.is_compatible_with(FieldType::String));
        assert!(!FieldType::String.is_compatible_with(FieldType::Integer));
    }
}
