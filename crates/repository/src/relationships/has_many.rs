//! HasMany Relationship - zero or more targets hold the foreign key

use std::sync::Arc;

use serde_json::Value;

use super::related::RelatedRecords;
use super::resolver::ResolvedRelation;
use crate::error::{RepositoryError, RepositoryResult};
use crate::filter::{Filter, Where};
use crate::model::Record;
use crate::repository::EntityCrudRepository;

/// Produces hasMany repositories scoped to an owner
pub struct HasManyFactory {
    relation: Arc<ResolvedRelation>,
    target: Arc<dyn EntityCrudRepository>,
}

impl HasManyFactory {
    pub fn new(relation: Arc<ResolvedRelation>, target: Arc<dyn EntityCrudRepository>) -> Self {
        Self { relation, target }
    }

    pub fn relation(&self) -> &ResolvedRelation {
        &self.relation
    }

    pub fn for_owner(&self, owner: &Record) -> RepositoryResult<HasManyRepository> {
        let owner_key = self.relation.owner_key(owner)?;
        Ok(self.scoped(owner_key))
    }

    /// Scope by the owner's key value directly
    pub fn for_id(&self, owner_key: impl Into<Value>) -> RepositoryResult<HasManyRepository> {
        let owner_key = owner_key.into();
        if owner_key.is_null() {
            return Err(RepositoryError::MissingIdentifier {
                model: self.relation.owner.name.clone(),
                key: self.relation.key_from.clone(),
            });
        }
        Ok(self.scoped(owner_key))
    }

    fn scoped(&self, owner_key: Value) -> HasManyRepository {
        HasManyRepository {
            relation: self.relation.clone(),
            target: self.target.clone(),
            owner_key,
        }
    }
}

/// hasMany targets of one owner
///
/// Every operation is constrained by `key_to = owner key`; caller filters and
/// where clauses can only narrow that constraint.
pub struct HasManyRepository {
    relation: Arc<ResolvedRelation>,
    target: Arc<dyn EntityCrudRepository>,
    owner_key: Value,
}

impl HasManyRepository {
    pub fn owner_key(&self) -> &Value {
        &self.owner_key
    }

    fn constraint(&self) -> Where {
        Where::eq(self.relation.key_to.clone(), self.owner_key.clone())
    }

    /// Lazy sequence of the owner's targets
    pub fn list(&self, filter: Option<Filter>) -> RelatedRecords {
        RelatedRecords::direct(self.target.clone(), Filter::constrained(filter, self.constraint()))
    }

    /// Fetch the owner's targets now
    pub async fn find(&self, filter: Option<Filter>) -> RepositoryResult<Vec<Record>> {
        self.list(filter).fetch().await
    }

    /// Create a target with its foreign key set to the owner
    pub async fn create(&self, data: Record) -> RepositoryResult<Record> {
        let mut data = data;
        self.relation.enforce_key(
            &self.relation.target,
            &mut data,
            &self.relation.key_to,
            &self.owner_key,
            true,
        )?;
        self.target.create(data).await
    }

    /// Patch the owner's targets matching `where_clause`
    pub async fn patch(&self, data: Record, where_clause: Option<Where>) -> RepositoryResult<u64> {
        let mut data = data;
        self.relation.enforce_key(
            &self.relation.target,
            &mut data,
            &self.relation.key_to,
            &self.owner_key,
            false,
        )?;
        let constraint = Where::constrain(where_clause, self.constraint());
        self.target.update_all(data, Some(constraint)).await
    }

    /// Delete the owner's targets matching `where_clause`
    pub async fn delete(&self, where_clause: Option<Where>) -> RepositoryResult<u64> {
        let constraint = Where::constrain(where_clause, self.constraint());
        self.target.delete_all(Some(constraint)).await
    }

    pub async fn count(&self, where_clause: Option<Where>) -> RepositoryResult<u64> {
        let constraint = Where::constrain(where_clause, self.constraint());
        self.target.count(Some(constraint)).await
    }
}

impl std::fmt::Debug for HasManyFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HasManyFactory")
            .field("relation", &self.relation.name)
            .field("target", &self.relation.target.name)
            .finish()
    }
}

impl std::fmt::Debug for HasManyRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HasManyRepository")
            .field("relation", &self.relation.name)
            .field("owner_key", &self.owner_key)
            .finish()
    }
}
