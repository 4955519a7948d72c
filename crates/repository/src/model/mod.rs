//! Model System - Definitions, records and naming conventions
//!
//! - `definition`: model/entity schemas and the static `Model` trait
//! - `record`: dynamic rows exchanged with data sources
//! - `naming`: repository names and conventional foreign keys

pub mod definition;
pub mod naming;
pub mod record;

pub use definition::{FieldDefinition, FieldType, Model, ModelDefinition, ModelKind};
pub use naming::{foreign_key_name, repository_name, KeyConvention};
pub use record::Record;
