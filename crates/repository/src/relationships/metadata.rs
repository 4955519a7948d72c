//! Relationship Metadata System - Declarative relation definitions
//!
//! Relations are declared on the owning entity's definition. Keys left unset
//! are filled from the configured key convention when the owner is registered.

use serde::{Deserialize, Serialize};

use crate::error::{RepositoryError, RepositoryResult};
use crate::model::naming::{foreign_key_name, relation_name_from_key, KeyConvention};
use crate::model::ModelDefinition;

/// Defines the kind of relation between two entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelationKind {
    /// Owner holds a foreign key to the target
    BelongsTo,
    /// Exactly one target holds a foreign key to the owner
    HasOne,
    /// Zero or more targets hold a foreign key to the owner
    HasMany,
    /// Targets are reached through a join entity holding keys to both sides
    HasManyThrough,
}

impl RelationKind {
    /// Returns true if this relation yields a collection
    pub fn is_collection(self) -> bool {
        matches!(self, Self::HasMany | Self::HasManyThrough)
    }

    /// Returns true if the foreign key lives on the target side
    pub fn key_on_target(self) -> bool {
        matches!(self, Self::HasOne | Self::HasMany)
    }

    /// Returns true if this relation requires a join entity
    pub fn requires_through(self) -> bool {
        matches!(self, Self::HasManyThrough)
    }
}

impl std::fmt::Display for RelationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RelationKind::BelongsTo => "belongsTo",
            RelationKind::HasOne => "hasOne",
            RelationKind::HasMany => "hasMany",
            RelationKind::HasManyThrough => "hasManyThrough",
        };
        write!(f, "{}", name)
    }
}

/// Join entity configuration for hasMany-through relations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThroughDefinition {
    /// The join model name
    pub model: String,

    /// Key on the join model referencing the owner
    pub key_from: Option<String>,

    /// Key on the join model referencing the target
    pub key_to: Option<String>,
}

impl ThroughDefinition {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            key_from: None,
            key_to: None,
        }
    }
}

/// A relation declared on an owning entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationDefinition {
    pub kind: RelationKind,

    /// Accessor name; implicit for belongsTo, where it derives from the key
    pub name: Option<String>,

    /// The related model's name
    pub target: String,

    /// Key on the owner side of the relation
    pub key_from: Option<String>,

    /// Key on the target side of the relation
    pub key_to: Option<String>,

    /// Join entity for hasMany-through
    pub through: Option<ThroughDefinition>,
}

impl RelationDefinition {
    fn new(kind: RelationKind, name: Option<String>, target: String) -> Self {
        Self {
            kind,
            name,
            target,
            key_from: None,
            key_to: None,
            through: None,
        }
    }

    /// belongsTo declaration; name and key default from the target
    pub fn belongs_to(target: impl Into<String>) -> Self {
        Self::new(RelationKind::BelongsTo, None, target.into())
    }

    pub fn has_one(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(RelationKind::HasOne, Some(name.into()), target.into())
    }

    pub fn has_many(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(RelationKind::HasMany, Some(name.into()), target.into())
    }

    pub fn has_many_through(
        name: impl Into<String>,
        target: impl Into<String>,
        through: impl Into<String>,
    ) -> Self {
        let mut relation = Self::new(RelationKind::HasManyThrough, Some(name.into()), target.into());
        relation.through = Some(ThroughDefinition::new(through));
        relation
    }

    /// Set the accessor name explicitly
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn key_from(mut self, key: impl Into<String>) -> Self {
        self.key_from = Some(key.into());
        self
    }

    pub fn key_to(mut self, key: impl Into<String>) -> Self {
        self.key_to = Some(key.into());
        self
    }

    /// Set the join model's keys to the owner and the target
    pub fn through_keys(mut self, key_from: impl Into<String>, key_to: impl Into<String>) -> Self {
        if let Some(through) = self.through.as_mut() {
            through.key_from = Some(key_from.into());
            through.key_to = Some(key_to.into());
        }
        self
    }

    /// Fill every key that follows from naming conventions alone
    ///
    /// The belongsTo `key_to` stays unset: it is the target's id field and is
    /// only known once the target is resolved.
    pub fn with_defaults(mut self, owner: &ModelDefinition, convention: KeyConvention) -> Self {
        match self.kind {
            RelationKind::BelongsTo => {
                let key_from = self
                    .key_from
                    .get_or_insert_with(|| foreign_key_name(&self.target, convention))
                    .clone();
                self.name.get_or_insert_with(|| relation_name_from_key(&key_from));
            }
            RelationKind::HasOne | RelationKind::HasMany => {
                if self.key_from.is_none() {
                    self.key_from = owner.id_name().map(str::to_string);
                }
                self.key_to
                    .get_or_insert_with(|| foreign_key_name(&owner.name, convention));
            }
            RelationKind::HasManyThrough => {
                if self.key_from.is_none() {
                    self.key_from = owner.id_name().map(str::to_string);
                }
                if let Some(through) = self.through.as_mut() {
                    through
                        .key_from
                        .get_or_insert_with(|| foreign_key_name(&owner.name, convention));
                    through
                        .key_to
                        .get_or_insert_with(|| foreign_key_name(&self.target, convention));
                }
            }
        }
        self
    }

    /// Accessor name; always set once defaults are applied
    pub fn accessor_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.target)
    }

    /// Check the declaration is self-consistent, independent of the registry
    pub fn validate(&self, owner: &str) -> RepositoryResult<()> {
        let label = self.accessor_name();

        if self.target.is_empty() {
            return Err(RepositoryError::invalid_relation(owner, label, "target model cannot be empty"));
        }

        if self.name.as_deref() == Some("") {
            return Err(RepositoryError::invalid_relation(owner, label, "relation name cannot be empty"));
        }

        if self.kind.requires_through() != self.through.is_some() {
            let reason = if self.kind.requires_through() {
                "hasManyThrough requires a join model"
            } else {
                "only hasManyThrough relations take a join model"
            };
            return Err(RepositoryError::invalid_relation(owner, label, reason));
        }

        if let Some(through) = &self.through {
            if through.model.is_empty() {
                return Err(RepositoryError::invalid_relation(owner, label, "join model cannot be empty"));
            }
            if through.key_from.is_some() && through.key_from == through.key_to {
                return Err(RepositoryError::invalid_relation(
                    owner,
                    label,
                    "join model keys to the owner and target must differ",
                ));
            }
        }

        Ok(())
    }
}
