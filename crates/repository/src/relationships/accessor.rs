//! Relation accessors - the per-repository value behind a relation name

use std::sync::Arc;

use super::belongs_to::BelongsToAccessor;
use super::has_many::HasManyFactory;
use super::has_many_through::HasManyThroughFactory;
use super::has_one::HasOneFactory;
use super::metadata::RelationKind;
use super::resolver::ResolvedRelation;

/// Accessor for one declared relation, created on first use and cached
#[derive(Debug, Clone)]
pub enum RelationAccessor {
    BelongsTo(Arc<BelongsToAccessor>),
    HasOne(Arc<HasOneFactory>),
    HasMany(Arc<HasManyFactory>),
    HasManyThrough(Arc<HasManyThroughFactory>),
}

impl RelationAccessor {
    pub fn relation(&self) -> &ResolvedRelation {
        match self {
            RelationAccessor::BelongsTo(accessor) => accessor.relation(),
            RelationAccessor::HasOne(factory) => factory.relation(),
            RelationAccessor::HasMany(factory) => factory.relation(),
            RelationAccessor::HasManyThrough(factory) => factory.relation(),
        }
    }

    pub fn kind(&self) -> RelationKind {
        self.relation().kind
    }

    pub fn name(&self) -> &str {
        &self.relation().name
    }
}
