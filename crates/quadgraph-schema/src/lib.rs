//! QuadGraph Schema Mapping
//!
//! Converts typed application records to and from sets of quads.
//!
//! # Overview
//!
//! Each record type is described once by an [`EntityDescriptor`]: its type
//! tag and a [`FieldBinding`] per field naming the predicate, the kind of
//! value, the edge direction and the cardinality. The [`SchemaMapper`] uses
//! the descriptors held in a [`TypeRegistry`] to decompose a [`Record`] into
//! quads and to rebuild it from the store.
//!
//! Application types join in by implementing [`Encodable`] and
//! [`Decodable`], which convert to and from the untyped [`Record`].

pub mod descriptor;
pub mod entity;
pub mod mapper;
pub mod record;
pub mod registry;

pub use descriptor::{Cardinality, Direction, EntityDescriptor, FieldBinding, FieldKind};
pub use entity::{Decodable, Encodable, Entity};
pub use mapper::{MAX_NESTING_DEPTH, SchemaMapper};
pub use record::{FieldValue, FromValue, Record};
pub use registry::TypeRegistry;
