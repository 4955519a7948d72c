//! HasOne Relationship - a single target holds the foreign key

use std::sync::Arc;

use serde_json::Value;

use super::resolver::ResolvedRelation;
use crate::config::HasOnePolicy;
use crate::error::{RepositoryError, RepositoryResult};
use crate::filter::{Filter, Where};
use crate::model::Record;
use crate::repository::EntityCrudRepository;

/// Produces hasOne repositories scoped to an owner
pub struct HasOneFactory {
    relation: Arc<ResolvedRelation>,
    target: Arc<dyn EntityCrudRepository>,
    policy: HasOnePolicy,
}

impl HasOneFactory {
    pub fn new(relation: Arc<ResolvedRelation>, target: Arc<dyn EntityCrudRepository>, policy: HasOnePolicy) -> Self {
        Self {
            relation,
            target,
            policy,
        }
    }

    pub fn relation(&self) -> &ResolvedRelation {
        &self.relation
    }

    pub fn for_owner(&self, owner: &Record) -> RepositoryResult<HasOneRepository> {
        let owner_key = self.relation.owner_key(owner)?;
        Ok(self.scoped(owner_key))
    }

    /// Scope by the owner's key value directly
    pub fn for_id(&self, owner_key: impl Into<Value>) -> RepositoryResult<HasOneRepository> {
        let owner_key = owner_key.into();
        if owner_key.is_null() {
            return Err(RepositoryError::MissingIdentifier {
                model: self.relation.owner.name.clone(),
                key: self.relation.key_from.clone(),
            });
        }
        Ok(self.scoped(owner_key))
    }

    fn scoped(&self, owner_key: Value) -> HasOneRepository {
        HasOneRepository {
            relation: self.relation.clone(),
            target: self.target.clone(),
            policy: self.policy,
            owner_key,
        }
    }
}

/// hasOne target of one owner
pub struct HasOneRepository {
    relation: Arc<ResolvedRelation>,
    target: Arc<dyn EntityCrudRepository>,
    policy: HasOnePolicy,
    owner_key: Value,
}

impl HasOneRepository {
    pub fn owner_key(&self) -> &Value {
        &self.owner_key
    }

    fn constraint(&self) -> Where {
        Where::eq(self.relation.key_to.clone(), self.owner_key.clone())
    }

    /// The owner's target, if any
    ///
    /// More than one match is data inconsistency: under `HasOnePolicy::First`
    /// the first match is returned, under `Strict` it is an error.
    pub async fn get(&self, filter: Option<Filter>) -> RepositoryResult<Option<Record>> {
        let filter = Filter::constrained(filter, self.constraint()).limit(2);
        let where_clause = filter.where_clause.clone();
        let mut found = self.target.find(Some(filter)).await?;

        if found.len() > 1 {
            match self.policy {
                HasOnePolicy::First => {
                    tracing::warn!(
                        "hasOne '{}' of {} {} matches more than one {}, using the first",
                        self.relation.name,
                        self.relation.owner.name,
                        self.owner_key,
                        self.relation.target.name
                    );
                }
                HasOnePolicy::Strict => {
                    let count = self.target.count(where_clause).await?;
                    return Err(self.inconsistent(count as usize));
                }
            }
        }

        Ok(if found.is_empty() { None } else { Some(found.swap_remove(0)) })
    }

    /// Create the target with its foreign key set to the owner
    pub async fn create(&self, data: Record) -> RepositoryResult<Record> {
        let mut data = data;
        self.relation.enforce_key(
            &self.relation.target,
            &mut data,
            &self.relation.key_to,
            &self.owner_key,
            true,
        )?;

        if self.policy == HasOnePolicy::Strict {
            let existing = self.target.count(Some(self.constraint())).await?;
            if existing > 0 {
                return Err(self.inconsistent(existing as usize + 1));
            }
        }

        self.target.create(data).await
    }

    /// Patch the target, returning how many records changed
    pub async fn patch(&self, data: Record) -> RepositoryResult<u64> {
        let mut data = data;
        self.relation.enforce_key(
            &self.relation.target,
            &mut data,
            &self.relation.key_to,
            &self.owner_key,
            false,
        )?;
        self.target.update_all(data, Some(self.constraint())).await
    }

    /// Delete the target, returning how many records were removed
    pub async fn delete(&self) -> RepositoryResult<u64> {
        self.target.delete_all(Some(self.constraint())).await
    }

    fn inconsistent(&self, found: usize) -> RepositoryError {
        RepositoryError::InconsistentRelation {
            relation: self.relation.name.clone(),
            target: self.relation.target.name.clone(),
            found,
        }
    }
}

impl std::fmt::Debug for HasOneFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HasOneFactory")
            .field("relation", &self.relation.name)
            .field("policy", &self.policy)
            .finish()
    }
}

impl std::fmt::Debug for HasOneRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HasOneRepository")
            .field("relation", &self.relation.name)
            .field("owner_key", &self.owner_key)
            .finish()
    }
}
