//! Capability sets - what a base implementation declares it can do
//!
//! Each construction mode requires a fixed set of operations. A base
//! implementation reports its own set and the factory refuses to build a
//! repository type when anything required is missing.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single repository operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Capability {
    Create,
    CreateAll,
    Find,
    UpdateAll,
    DeleteAll,
    Count,
    FindById,
    UpdateById,
    ReplaceById,
    DeleteById,
    Exists,
    Get,
    Set,
    Delete,
    Expire,
    Ttl,
    Keys,
}

impl Capability {
    pub fn as_str(self) -> &'static str {
        match self {
            Capability::Create => "create",
            Capability::CreateAll => "createAll",
            Capability::Find => "find",
            Capability::UpdateAll => "updateAll",
            Capability::DeleteAll => "deleteAll",
            Capability::Count => "count",
            Capability::FindById => "findById",
            Capability::UpdateById => "updateById",
            Capability::ReplaceById => "replaceById",
            Capability::DeleteById => "deleteById",
            Capability::Exists => "exists",
            Capability::Get => "get",
            Capability::Set => "set",
            Capability::Delete => "delete",
            Capability::Expire => "expire",
            Capability::Ttl => "ttl",
            Capability::Keys => "keys",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

const CRUD: &[Capability] = &[
    Capability::Create,
    Capability::CreateAll,
    Capability::Find,
    Capability::UpdateAll,
    Capability::DeleteAll,
    Capability::Count,
];

const ENTITY: &[Capability] = &[
    Capability::FindById,
    Capability::UpdateById,
    Capability::ReplaceById,
    Capability::DeleteById,
    Capability::Exists,
];

const KEY_VALUE: &[Capability] = &[
    Capability::Get,
    Capability::Set,
    Capability::Delete,
    Capability::DeleteAll,
    Capability::Expire,
    Capability::Ttl,
    Capability::Keys,
];

/// Ordered set of capabilities
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySet(BTreeSet<Capability>);

impl CapabilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Operations of a plain-model CRUD repository
    pub fn crud() -> Self {
        CRUD.iter().copied().collect()
    }

    /// CRUD plus the id-based operations of an entity repository
    pub fn entity_crud() -> Self {
        CRUD.iter().chain(ENTITY).copied().collect()
    }

    /// Operations of a key-value repository
    pub fn key_value() -> Self {
        KEY_VALUE.iter().copied().collect()
    }

    pub fn with(mut self, capability: Capability) -> Self {
        self.0.insert(capability);
        self
    }

    pub fn without(mut self, capability: Capability) -> Self {
        self.0.remove(&capability);
        self
    }

    pub fn contains(&self, capability: Capability) -> bool {
        self.0.contains(&capability)
    }

    /// Capabilities of `required` that this set lacks, in declaration order
    pub fn missing(&self, required: &CapabilitySet) -> Vec<Capability> {
        required.0.difference(&self.0).copied().collect()
    }

    /// Capabilities present in both sets
    pub fn intersection(&self, other: &CapabilitySet) -> CapabilitySet {
        self.0.intersection(&other.0).copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Construction mode of a repository type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RepositoryMode {
    /// Plain models, no identity
    Crud,
    /// Entities with id-based operations and relation accessors
    EntityCrud,
    /// Key-value stores
    KeyValue,
}

impl RepositoryMode {
    /// Capabilities a base must declare to back this mode
    pub fn required(self) -> CapabilitySet {
        match self {
            RepositoryMode::Crud => CapabilitySet::crud(),
            RepositoryMode::EntityCrud => CapabilitySet::entity_crud(),
            RepositoryMode::KeyValue => CapabilitySet::key_value(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RepositoryMode::Crud => "crud",
            RepositoryMode::EntityCrud => "entity-crud",
            RepositoryMode::KeyValue => "key-value",
        }
    }
}

impl fmt::Display for RepositoryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
