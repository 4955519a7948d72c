//! Lazy related-record sequences returned by collection relations

use std::sync::Arc;

use futures::stream::{self, BoxStream, StreamExt};

use super::has_many_through::collect_target_keys;
use crate::error::RepositoryResult;
use crate::filter::{Filter, Where};
use crate::model::Record;
use crate::repository::EntityCrudRepository;

#[derive(Clone)]
enum FetchPlan {
    /// One query on the target
    Direct {
        target: Arc<dyn EntityCrudRepository>,
        filter: Filter,
    },
    /// Join records first, then targets keyed by what they reference
    Through {
        join: Arc<dyn EntityCrudRepository>,
        join_where: Where,
        join_key: String,
        target: Arc<dyn EntityCrudRepository>,
        target_key: String,
        filter: Option<Filter>,
    },
}

/// Finite, restartable sequence of related records
///
/// Nothing is queried until `fetch` or `stream` is called, and every call
/// queries again.
#[derive(Clone)]
pub struct RelatedRecords {
    plan: FetchPlan,
}

impl RelatedRecords {
    pub(crate) fn direct(target: Arc<dyn EntityCrudRepository>, filter: Filter) -> Self {
        Self {
            plan: FetchPlan::Direct { target, filter },
        }
    }

    pub(crate) fn through(
        join: Arc<dyn EntityCrudRepository>,
        join_where: Where,
        join_key: String,
        target: Arc<dyn EntityCrudRepository>,
        target_key: String,
        filter: Option<Filter>,
    ) -> Self {
        Self {
            plan: FetchPlan::Through {
                join,
                join_where,
                join_key,
                target,
                target_key,
                filter,
            },
        }
    }

    /// Run the query and collect every record
    pub async fn fetch(&self) -> RepositoryResult<Vec<Record>> {
        match &self.plan {
            FetchPlan::Direct { target, filter } => target.find(Some(filter.clone())).await,
            FetchPlan::Through {
                join,
                join_where,
                join_key,
                target,
                target_key,
                filter,
            } => {
                let keys = collect_target_keys(join.as_ref(), join_where.clone(), join_key).await?;
                if keys.is_empty() {
                    tracing::trace!("No {} records to follow", join.model().name);
                    return Ok(Vec::new());
                }
                tracing::trace!(
                    "Following {} {} records to {}",
                    keys.len(),
                    join.model().name,
                    target.model().name
                );
                let constraint = Where::inq(target_key.clone(), keys);
                target
                    .find(Some(Filter::constrained(filter.clone(), constraint)))
                    .await
            }
        }
    }

    /// Stream the records of a fresh query
    ///
    /// A failed query yields its error as the only item.
    pub fn stream(&self) -> BoxStream<'static, RepositoryResult<Record>> {
        let records = self.clone();
        stream::once(async move { records.fetch().await })
            .flat_map(|fetched| {
                let items: Vec<RepositoryResult<Record>> = match fetched {
                    Ok(records) => records.into_iter().map(Ok).collect(),
                    Err(err) => vec![Err(err)],
                };
                stream::iter(items)
            })
            .boxed()
    }
}

impl std::fmt::Debug for RelatedRecords {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.plan {
            FetchPlan::Direct { target, filter } => f
                .debug_struct("RelatedRecords")
                .field("target", &target.model().name)
                .field("filter", filter)
                .finish(),
            FetchPlan::Through {
                join, target, filter, ..
            } => f
                .debug_struct("RelatedRecords")
                .field("through", &join.model().name)
                .field("target", &target.model().name)
                .field("filter", filter)
                .finish(),
        }
    }
}
