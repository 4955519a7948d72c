//! Relationships Module - declarations, resolution and relation accessors

pub mod metadata;
pub mod resolver;

pub mod accessor;
pub mod belongs_to;
pub mod has_many;
pub mod has_many_through;
pub mod has_one;
pub mod related;

// Re-export main types
pub use accessor::RelationAccessor;
pub use belongs_to::BelongsToAccessor;
pub use has_many::{HasManyFactory, HasManyRepository};
pub use has_many_through::{HasManyThroughFactory, HasManyThroughRepository};
pub use has_one::{HasOneFactory, HasOneRepository};
pub use related::RelatedRecords;

// Re-export metadata and resolution types
pub use metadata::{RelationDefinition, RelationKind, ThroughDefinition};
pub use resolver::{RelationResolver, ResolvedRelation, ResolvedThrough};
