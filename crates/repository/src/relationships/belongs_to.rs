//! BelongsTo Relationship - owner holds the foreign key

use std::sync::Arc;

use serde_json::Value;

use super::resolver::ResolvedRelation;
use crate::error::RepositoryResult;
use crate::filter::{Filter, Where};
use crate::model::Record;
use crate::repository::EntityCrudRepository;

/// Fetches the single target an owner record points at
pub struct BelongsToAccessor {
    relation: Arc<ResolvedRelation>,
    owner: Arc<dyn EntityCrudRepository>,
    target: Arc<dyn EntityCrudRepository>,
}

impl BelongsToAccessor {
    pub fn new(
        relation: Arc<ResolvedRelation>,
        owner: Arc<dyn EntityCrudRepository>,
        target: Arc<dyn EntityCrudRepository>,
    ) -> Self {
        Self {
            relation,
            owner,
            target,
        }
    }

    pub fn relation(&self) -> &ResolvedRelation {
        &self.relation
    }

    /// Target referenced by `owner`; `None` when the foreign key is unset or dangling
    pub async fn get(&self, owner: &Record) -> RepositoryResult<Option<Record>> {
        let Some(foreign_key) = owner.value_of(&self.relation.key_from) else {
            tracing::trace!(
                "{}.{} is unset, no {} to load",
                self.relation.owner.name,
                self.relation.key_from,
                self.relation.target.name
            );
            return Ok(None);
        };

        if self.relation.targets_id() {
            return self.target.find_by_id(foreign_key).await;
        }

        let filter = Filter::by(Where::eq(self.relation.key_to.clone(), foreign_key.clone())).limit(1);
        Ok(self.target.find(Some(filter)).await?.into_iter().next())
    }

    /// Load the owner by id, then its target; `None` when either is missing
    pub async fn get_for_id(&self, owner_id: &Value) -> RepositoryResult<Option<Record>> {
        match self.owner.find_by_id(owner_id).await? {
            Some(owner) => self.get(&owner).await,
            None => Ok(None),
        }
    }
}

impl std::fmt::Debug for BelongsToAccessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BelongsToAccessor")
            .field("relation", &self.relation.name)
            .field("target", &self.relation.target.name)
            .finish()
    }
}
