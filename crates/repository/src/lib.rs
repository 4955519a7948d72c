//! # elif-repository: Repository Layer for elif.rs
//!
//! Builds named repository types for registered models and resolves the
//! relations between entities (belongsTo, hasOne, hasMany, hasMany-through)
//! over a pluggable data source.
//!
//! ```no_run
//! use std::sync::Arc;
//! use elif_repository::{
//!     FieldType, MemoryDataSource, ModelDefinition, RelationDefinition, RepositoryConfig,
//!     RepositoryFactory,
//! };
//!
//! # async fn demo() -> elif_repository::RepositoryResult<()> {
//! let factory = RepositoryFactory::with_config(RepositoryConfig::default());
//! factory.registry().register(
//!     ModelDefinition::entity("Customer")
//!         .generated_id("id", FieldType::Integer)
//!         .relation(RelationDefinition::has_many("orders", "Order")),
//! )?;
//! factory.registry().register(
//!     ModelDefinition::entity("Order")
//!         .generated_id("id", FieldType::Integer)
//!         .field("customer_id", FieldType::Integer),
//! )?;
//!
//! let customers = factory
//!     .entity_repository_type("Customer", None)?
//!     .construct(Arc::new(MemoryDataSource::default()));
//! let orders = customers.has_many("orders")?.for_id(1)?.find(None).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod datasource;
pub mod error;
pub mod filter;
pub mod model;
pub mod registry;
pub mod relationships;
pub mod repository;

// Re-export core types
pub use config::{ConflictPolicy, HasOnePolicy, RepositoryConfig};
pub use datasource::{
    DataSource, DataSourceError, DataSourceResult, KeyTtl, KeyValueDataSource, MemoryDataSource,
};
pub use error::{ConfigError, RepositoryError, RepositoryResult};
pub use filter::{Condition, Filter, OrderDirection, Where};
pub use model::{
    FieldDefinition, FieldType, KeyConvention, Model, ModelDefinition, ModelKind, Record,
};
pub use registry::ModelRegistry;
pub use relationships::*;
pub use repository::*;
