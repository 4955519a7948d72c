//! Filters - where clause, ordering, pagination and include hints
//!
//! The repository layer only ever adds constraints to a filter; evaluating it
//! is the data source's job. `Filter::apply` is the reference evaluation used by
//! in-process data sources.

pub mod where_clause;

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::model::Record;

pub use where_clause::{compare_values, values_equal, Condition, Where};

/// Order by direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderDirection {
    Asc,
    Desc,
}

impl std::fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderDirection::Asc => write!(f, "ASC"),
            OrderDirection::Desc => write!(f, "DESC"),
        }
    }
}

/// Query filter accepted by `find` operations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    #[serde(rename = "where", default, skip_serializing_if = "Option::is_none")]
    pub where_clause: Option<Where>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub order: Vec<(String, OrderDirection)>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip: Option<usize>,

    /// Relation names to eager-load; honored by data sources that support it
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter with only a where clause
    pub fn by(clause: Where) -> Self {
        Self {
            where_clause: Some(clause),
            ..Self::default()
        }
    }

    /// Narrow the where clause with an additional condition
    pub fn and_where(mut self, clause: Where) -> Self {
        self.where_clause = Some(Where::constrain(self.where_clause.take(), clause));
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: OrderDirection) -> Self {
        self.order.push((field.into(), direction));
        self
    }

    pub fn limit(mut self, count: usize) -> Self {
        self.limit = Some(count);
        self
    }

    pub fn skip(mut self, count: usize) -> Self {
        self.skip = Some(count);
        self
    }

    /// Pagination (LIMIT + OFFSET), pages starting at 1
    pub fn paginate(self, per_page: usize, page: usize) -> Self {
        self.limit(per_page).skip(page.saturating_sub(1) * per_page)
    }

    pub fn include(mut self, relation: impl Into<String>) -> Self {
        self.include.push(relation.into());
        self
    }

    /// Merge a mandatory constraint into an optional caller filter
    ///
    /// Ordering, pagination and includes pass through; the where clause
    /// becomes `constraint AND caller`.
    pub fn constrained(filter: Option<Filter>, constraint: Where) -> Filter {
        let mut filter = filter.unwrap_or_default();
        filter.where_clause = Some(Where::constrain(filter.where_clause.take(), constraint));
        filter
    }

    /// Evaluate this filter over in-memory records
    pub fn apply<I>(&self, records: I) -> Vec<Record>
    where
        I: IntoIterator<Item = Record>,
    {
        let mut matched: Vec<Record> = records
            .into_iter()
            .filter(|record| {
                self.where_clause
                    .as_ref()
                    .map_or(true, |clause| clause.matches(record))
            })
            .collect();

        if !self.order.is_empty() {
            matched.sort_by(|a, b| self.compare(a, b));
        }

        let skip = self.skip.unwrap_or(0);
        let limit = self.limit.unwrap_or(usize::MAX);
        matched.into_iter().skip(skip).take(limit).collect()
    }

    fn compare(&self, a: &Record, b: &Record) -> Ordering {
        for (field, direction) in &self.order {
            let ordering = match (a.value_of(field), b.value_of(field)) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (Some(x), Some(y)) => compare_values(x, y).unwrap_or(Ordering::Equal),
            };
            let ordering = match direction {
                OrderDirection::Asc => ordering,
                OrderDirection::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}
