//! Repository configuration types and builders
//!
//! Policies that the repository layer must make explicit: how conflicting
//! model registrations are handled, what hasOne does with duplicate targets,
//! which naming convention implicit foreign keys follow, and the default
//! expiry of key-value entries.

use serde::{Deserialize, Serialize};
use service_builder::builder;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::model::naming::KeyConvention;

/// Prefix of every environment variable read by `RepositoryConfig::from_env`
pub const ENV_PREFIX: &str = "ELIF_REPOSITORY_";

/// What `ModelRegistry::register` does when a name is already taken by a different shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    /// Fail with `DuplicateDefinition`
    Reject,
    /// Replace the previous definition
    Replace,
}

impl FromStr for ConflictPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reject" => Ok(ConflictPolicy::Reject),
            "replace" | "override" => Ok(ConflictPolicy::Replace),
            _ => Err(ConfigError::InvalidValue {
                field: "conflict_policy".to_string(),
                value: s.to_string(),
                expected: "reject or replace".to_string(),
            }),
        }
    }
}

/// How a hasOne accessor treats more than one matching target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HasOnePolicy {
    /// Return the first match in data source order and log a warning
    First,
    /// Fail with `InconsistentRelation`
    Strict,
}

impl FromStr for HasOnePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "first" => Ok(HasOnePolicy::First),
            "strict" => Ok(HasOnePolicy::Strict),
            _ => Err(ConfigError::InvalidValue {
                field: "has_one_policy".to_string(),
                value: s.to_string(),
                expected: "first or strict".to_string(),
            }),
        }
    }
}

/// Configuration shared by the registry, the factory and the repositories it builds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[builder]
pub struct RepositoryConfig {
    /// Registration conflict handling
    #[builder(getter, default = "ConflictPolicy::Reject")]
    pub conflict_policy: ConflictPolicy,

    /// Duplicate hasOne target handling
    #[builder(getter, default = "HasOnePolicy::First")]
    pub has_one_policy: HasOnePolicy,

    /// Convention for foreign keys a relation does not name
    #[builder(getter, default = "KeyConvention::Underscore")]
    pub key_convention: KeyConvention,

    /// Expiry applied by key-value repositories when `set` passes none
    #[builder(getter, default = "None")]
    pub key_value_default_ttl: Option<Duration>,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            conflict_policy: ConflictPolicy::Reject,
            has_one_policy: HasOnePolicy::First,
            key_convention: KeyConvention::Underscore,
            key_value_default_ttl: None,
        }
    }
}

impl RepositoryConfig {
    /// Load configuration from `ELIF_REPOSITORY_*` environment variables, defaulting the rest
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = read_env("CONFLICT_POLICY") {
            config.conflict_policy = value.parse()?;
        }

        if let Some(value) = read_env("HAS_ONE_POLICY") {
            config.has_one_policy = value.parse()?;
        }

        if let Some(value) = read_env("KEY_CONVENTION") {
            config.key_convention = value.parse().map_err(|_| ConfigError::InvalidValue {
                field: "key_convention".to_string(),
                value: value.clone(),
                expected: "underscore or camel".to_string(),
            })?;
        }

        if let Some(value) = read_env("KV_DEFAULT_TTL") {
            let seconds: u64 = value.parse().map_err(|_| ConfigError::InvalidValue {
                field: "key_value_default_ttl".to_string(),
                value: value.clone(),
                expected: "a whole number of seconds".to_string(),
            })?;
            config.key_value_default_ttl = Some(Duration::from_secs(seconds));
        }

        config.validate()?;
        tracing::debug!("Loaded repository configuration from environment: {:?}", config);
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(ttl) = self.key_value_default_ttl {
            if ttl.is_zero() {
                return Err(ConfigError::ValidationFailed {
                    message: "key_value_default_ttl must be greater than zero".to_string(),
                });
            }
        }
        Ok(())
    }
}

fn read_env(suffix: &str) -> Option<String> {
    env::var(format!("{}{}", ENV_PREFIX, suffix))
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
