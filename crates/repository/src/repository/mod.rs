//! Repositories - contracts, capability checks, default bases and the factory

pub mod builder;
pub mod capabilities;
pub mod default_crud;
pub mod entity;
pub mod instance;
pub mod key_value;
pub mod traits;

pub use builder::{CrudRepositoryType, EntityRepositoryType, KeyValueRepositoryType, RepositoryFactory};
pub use capabilities::{Capability, CapabilitySet, RepositoryMode};
pub use default_crud::{DataSourceRepository, DefaultCrudRepository};
pub use entity::EntityRepository;
pub use instance::{CrudRepositoryInstance, KeyValueRepositoryInstance};
pub use key_value::{DataSourceKeyValueRepository, DefaultKeyValueRepository};
pub use traits::{
    BaseImplementation, CrudBase, CrudRepository, EntityCrudBase, EntityCrudRepository, KeyValueBase,
    KeyValueRepository,
};
