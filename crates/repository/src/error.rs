//! Error types for the repository layer
//!
//! Construction-time failures (unknown models, conflicting definitions, bases
//! missing capabilities) and per-call failures share one enum. Data source
//! faults are carried through untouched so callers can match on the original
//! backend error.

use crate::datasource::DataSourceError;

/// Result type alias for repository operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Error types for repository construction and relation traversal
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RepositoryError {
    /// Lookup of a model name that was never registered
    #[error("Unknown model '{0}'")]
    UnknownModel(String),

    /// A different definition is already registered under this name
    #[error("Model '{name}' is already registered with a different definition")]
    DuplicateDefinition { name: String },

    /// The base implementation lacks capabilities required by the construction mode
    #[error("Base implementation '{base}' cannot back {repository} in {mode} mode: missing {missing:?}")]
    InvalidBaseImplementation {
        repository: String,
        base: String,
        mode: String,
        missing: Vec<String>,
    },

    /// The model definition itself is malformed
    #[error("Invalid definition for model '{model}': {reason}")]
    InvalidDefinition { model: String, reason: String },

    /// A relation declaration cannot be resolved against the registry
    #[error("Invalid relation '{relation}' on model '{model}': {reason}")]
    InvalidRelation {
        model: String,
        relation: String,
        reason: String,
    },

    /// No relation with this name is declared on the model
    #[error("Model '{model}' declares no relation named '{relation}'")]
    UnknownRelation { model: String, relation: String },

    /// The relation exists but was requested as a different kind
    #[error("Relation '{relation}' is {actual}, not {requested}")]
    RelationKindMismatch {
        relation: String,
        actual: String,
        requested: String,
    },

    /// The owner record carries no value for the key a relation is scoped on
    #[error("Record of model '{model}' has no value for key '{key}'")]
    MissingIdentifier { model: String, key: String },

    /// A scoped write tried to move a record to another owner
    #[error("Property '{property}' of '{model}' is fixed to {expected} by relation '{relation}'")]
    RelationConstraint {
        model: String,
        relation: String,
        property: String,
        expected: serde_json::Value,
    },

    /// hasOne found more than one matching target under the strict policy
    #[error("Relation '{relation}' expected at most one '{target}' but found {found}")]
    InconsistentRelation {
        relation: String,
        target: String,
        found: usize,
    },

    /// Record (de)serialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid repository configuration
    #[error(transparent)]
    Configuration(#[from] ConfigError),

    /// Fault raised by the data source, passed through unchanged
    #[error(transparent)]
    DataSource(#[from] DataSourceError),
}

impl RepositoryError {
    /// Shorthand for relation validation failures
    pub(crate) fn invalid_relation(
        model: impl Into<String>,
        relation: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        RepositoryError::InvalidRelation {
            model: model.into(),
            relation: relation.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for definition validation failures
    pub(crate) fn invalid_definition(model: impl Into<String>, reason: impl Into<String>) -> Self {
        RepositoryError::InvalidDefinition {
            model: model.into(),
            reason: reason.into(),
        }
    }

    /// Check if the error originated in the data source
    pub fn is_data_source(&self) -> bool {
        matches!(self, RepositoryError::DataSource(_))
    }

    /// Check if the error happened while building a repository type
    pub fn is_construction(&self) -> bool {
        matches!(
            self,
            RepositoryError::UnknownModel(_)
                | RepositoryError::DuplicateDefinition { .. }
                | RepositoryError::InvalidBaseImplementation { .. }
                | RepositoryError::InvalidDefinition { .. }
        )
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}

/// Configuration error types
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {field}: '{value}', expected {expected}")]
    InvalidValue {
        field: String,
        value: String,
        expected: String,
    },

    #[error("Configuration validation failed: {message}")]
    ValidationFailed { message: String },
}
