//! HasManyThrough Relationship - targets reached through a join entity
//!
//! Reads are two steps: the owner's join records, then the targets whose key
//! is among the keys those join records hold. The steps are not atomic; a
//! failure in either fails the call.

use std::sync::Arc;

use serde_json::Value;

use super::related::RelatedRecords;
use super::resolver::{ResolvedRelation, ResolvedThrough};
use crate::error::{RepositoryError, RepositoryResult};
use crate::filter::{values_equal, Filter, Where};
use crate::model::Record;
use crate::repository::EntityCrudRepository;

/// Distinct non-null values of `key` over the join records matching `join_where`
pub(crate) async fn collect_target_keys(
    join: &dyn EntityCrudRepository,
    join_where: Where,
    key: &str,
) -> RepositoryResult<Vec<Value>> {
    let records = join.find(Some(Filter::by(join_where))).await?;
    let mut keys: Vec<Value> = Vec::with_capacity(records.len());
    for value in records.iter().filter_map(|record| record.value_of(key)) {
        if !keys.iter().any(|seen| values_equal(seen, value)) {
            keys.push(value.clone());
        }
    }
    Ok(keys)
}

/// Produces hasMany-through repositories scoped to an owner
pub struct HasManyThroughFactory {
    relation: Arc<ResolvedRelation>,
    target: Arc<dyn EntityCrudRepository>,
    join: Arc<dyn EntityCrudRepository>,
}

impl HasManyThroughFactory {
    pub fn new(
        relation: Arc<ResolvedRelation>,
        target: Arc<dyn EntityCrudRepository>,
        join: Arc<dyn EntityCrudRepository>,
    ) -> Self {
        Self {
            relation,
            target,
            join,
        }
    }

    pub fn relation(&self) -> &ResolvedRelation {
        &self.relation
    }

    pub fn for_owner(&self, owner: &Record) -> RepositoryResult<HasManyThroughRepository> {
        let owner_key = self.relation.owner_key(owner)?;
        self.scoped(owner_key)
    }

    /// Scope by the owner's key value directly
    pub fn for_id(&self, owner_key: impl Into<Value>) -> RepositoryResult<HasManyThroughRepository> {
        let owner_key = owner_key.into();
        if owner_key.is_null() {
            return Err(RepositoryError::MissingIdentifier {
                model: self.relation.owner.name.clone(),
                key: self.relation.key_from.clone(),
            });
        }
        self.scoped(owner_key)
    }

    fn scoped(&self, owner_key: Value) -> RepositoryResult<HasManyThroughRepository> {
        let through = self.relation.through.clone().ok_or_else(|| {
            RepositoryError::invalid_relation(
                &self.relation.owner.name,
                &self.relation.name,
                "hasManyThrough requires a join model",
            )
        })?;
        Ok(HasManyThroughRepository {
            relation: self.relation.clone(),
            through,
            target: self.target.clone(),
            join: self.join.clone(),
            owner_key,
        })
    }
}

/// hasMany-through targets of one owner
pub struct HasManyThroughRepository {
    relation: Arc<ResolvedRelation>,
    through: ResolvedThrough,
    target: Arc<dyn EntityCrudRepository>,
    join: Arc<dyn EntityCrudRepository>,
    owner_key: Value,
}

impl HasManyThroughRepository {
    pub fn owner_key(&self) -> &Value {
        &self.owner_key
    }

    /// Join records belonging to the owner
    fn join_constraint(&self) -> Where {
        Where::eq(self.through.key_from.clone(), self.owner_key.clone())
    }

    async fn target_keys(&self) -> RepositoryResult<Vec<Value>> {
        collect_target_keys(self.join.as_ref(), self.join_constraint(), &self.through.key_to).await
    }

    /// Lazy sequence of the owner's targets
    pub fn list(&self, filter: Option<Filter>) -> RelatedRecords {
        RelatedRecords::through(
            self.join.clone(),
            self.join_constraint(),
            self.through.key_to.clone(),
            self.target.clone(),
            self.relation.key_to.clone(),
            filter,
        )
    }

    /// Fetch the owner's targets now
    pub async fn find(&self, filter: Option<Filter>) -> RepositoryResult<Vec<Record>> {
        self.list(filter).fetch().await
    }

    /// Create a target and link it to the owner
    pub async fn create(&self, target_data: Record, join_data: Option<Record>) -> RepositoryResult<Record> {
        let created = self.target.create(target_data).await?;
        let target_key = created.value_of(&self.relation.key_to).cloned().ok_or_else(|| {
            RepositoryError::MissingIdentifier {
                model: self.relation.target.name.clone(),
                key: self.relation.key_to.clone(),
            }
        })?;
        self.link(&target_key, join_data).await?;
        Ok(created)
    }

    /// Create a join record between the owner and an existing target
    pub async fn link(&self, target_key: &Value, join_data: Option<Record>) -> RepositoryResult<Record> {
        let through = &self.through;
        let mut data = join_data.unwrap_or_default();
        self.relation
            .enforce_key(&through.model, &mut data, &through.key_from, &self.owner_key, true)?;
        self.relation
            .enforce_key(&through.model, &mut data, &through.key_to, target_key, true)?;
        self.join.create(data).await
    }

    /// Remove the join records between the owner and one target
    pub async fn unlink(&self, target_key: &Value) -> RepositoryResult<u64> {
        let clause = self
            .join_constraint()
            .and(Where::eq(self.through.key_to.clone(), target_key.clone()));
        self.join.delete_all(Some(clause)).await
    }

    /// Remove every join record of the owner
    pub async fn unlink_all(&self) -> RepositoryResult<u64> {
        self.join.delete_all(Some(self.join_constraint())).await
    }

    /// Patch the owner's targets matching `where_clause`
    pub async fn patch(&self, data: Record, where_clause: Option<Where>) -> RepositoryResult<u64> {
        let keys = self.target_keys().await?;
        if keys.is_empty() {
            return Ok(0);
        }
        let constraint = Where::constrain(where_clause, Where::inq(self.relation.key_to.clone(), keys));
        self.target.update_all(data, Some(constraint)).await
    }

    /// Delete the owner's targets matching `where_clause` along with their join records
    pub async fn delete(&self, where_clause: Option<Where>) -> RepositoryResult<u64> {
        let keys = self.target_keys().await?;
        if keys.is_empty() {
            return Ok(0);
        }
        let constraint = Where::constrain(where_clause, Where::inq(self.relation.key_to.clone(), keys));
        let doomed: Vec<Value> = self
            .target
            .find(Some(Filter::by(constraint)))
            .await?
            .iter()
            .filter_map(|record| record.value_of(&self.relation.key_to).cloned())
            .collect();
        if doomed.is_empty() {
            return Ok(0);
        }

        let join_clause = self
            .join_constraint()
            .and(Where::inq(self.through.key_to.clone(), doomed.clone()));
        self.join.delete_all(Some(join_clause)).await?;
        self.target
            .delete_all(Some(Where::inq(self.relation.key_to.clone(), doomed)))
            .await
    }

    pub async fn count(&self, where_clause: Option<Where>) -> RepositoryResult<u64> {
        let keys = self.target_keys().await?;
        if keys.is_empty() {
            return Ok(0);
        }
        let constraint = Where::constrain(where_clause, Where::inq(self.relation.key_to.clone(), keys));
        self.target.count(Some(constraint)).await
    }
}

impl std::fmt::Debug for HasManyThroughFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HasManyThroughFactory")
            .field("relation", &self.relation.name)
            .field("through", &self.join.model().name)
            .field("target", &self.relation.target.name)
            .finish()
    }
}

impl std::fmt::Debug for HasManyThroughRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HasManyThroughRepository")
            .field("relation", &self.relation.name)
            .field("owner_key", &self.owner_key)
            .finish()
    }
}
