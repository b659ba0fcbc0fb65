//! Capability traits for application types

use crate::descriptor::EntityDescriptor;
use crate::record::Record;
use quadgraph_core::{NodeRef, Result};

/// Types that can be written as quads
pub trait Encodable {
    /// Field form of the value
    fn to_record(&self) -> Record;
}

/// Types that can be rebuilt from quads
pub trait Decodable: Sized {
    /// Rebuild from field form
    ///
    /// Absent fields are left at their defaults unless the type insists on
    /// them; required fields have already been checked by the mapper.
    fn from_record(record: &Record) -> Result<Self>;
}

/// A record type with a registered shape
pub trait Entity: Encodable + Decodable {
    /// The descriptor for this type
    fn descriptor() -> EntityDescriptor;

    /// Descriptors of the records this type nests, registered alongside it
    fn nested_descriptors() -> Vec<EntityDescriptor> {
        Vec::new()
    }

    /// The subject node, if assigned
    fn id(&self) -> Option<&NodeRef>;

    /// Store the subject node assigned on insert
    fn set_id(&mut self, id: NodeRef);
}
