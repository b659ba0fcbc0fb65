//! Entity descriptors
//!
//! A descriptor binds a record type to its quad representation. It is built
//! once, registered, and never mutated afterwards.

use quadgraph_core::{Error, NodeRef, Result, ValueKind};
use std::collections::HashSet;

/// What a field holds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// A literal of the given kind
    Scalar(ValueKind),
    /// A reference to another node, stored as-is
    Node,
    /// A nested record described by the named descriptor
    Nested(String),
}

/// Which way the field's edge points
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Direction {
    /// `(record, predicate, value)`
    #[default]
    Forward,
    /// `(value, predicate, record)`; read-only, materialised from incoming edges
    Reverse,
}

/// How many values a field holds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Cardinality {
    /// At most one value; absent decodes to the type's default
    #[default]
    Single,
    /// At most one value; absent decodes to `None`
    Optional,
    /// An ordered sequence
    Repeated,
}

/// Binding of one record field to a predicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldBinding {
    pub name: String,
    pub predicate: NodeRef,
    pub kind: FieldKind,
    pub direction: Direction,
    pub cardinality: Cardinality,

    /// Decoding fails with `RequiredFieldMissing` when no value is stored.
    /// Not checked on write.
    pub required: bool,

    /// Declared but never written or read
    pub excluded: bool,
}

impl FieldBinding {
    fn new<N: Into<String>, P: Into<NodeRef>>(name: N, predicate: P, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            predicate: predicate.into(),
            kind,
            direction: Direction::Forward,
            cardinality: Cardinality::Single,
            required: false,
            excluded: false,
        }
    }

    /// A literal field
    pub fn scalar<N: Into<String>, P: Into<NodeRef>>(name: N, predicate: P, kind: ValueKind) -> Self {
        Self::new(name, predicate, FieldKind::Scalar(kind))
    }

    /// A node reference field
    pub fn node<N: Into<String>, P: Into<NodeRef>>(name: N, predicate: P) -> Self {
        Self::new(name, predicate, FieldKind::Node)
    }

    /// A nested record field
    pub fn nested<N, P, D>(name: N, predicate: P, descriptor: D) -> Self
    where
        N: Into<String>,
        P: Into<NodeRef>,
        D: Into<String>,
    {
        Self::new(name, predicate, FieldKind::Nested(descriptor.into()))
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.cardinality = Cardinality::Optional;
        self
    }

    pub fn repeated(mut self) -> Self {
        self.cardinality = Cardinality::Repeated;
        self
    }

    pub fn reverse(mut self) -> Self {
        self.direction = Direction::Reverse;
        self
    }

    pub fn excluded(mut self) -> Self {
        self.excluded = true;
        self
    }

    /// Returns true if the field is written on encode
    pub fn is_written(&self) -> bool {
        !self.excluded && self.direction == Direction::Forward
    }
}

/// The registered shape of a record type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDescriptor {
    /// Registry key, usually the Rust type name
    pub name: String,

    /// Written as an `rdf:type` quad; projections have none
    pub type_tag: Option<NodeRef>,

    pub fields: Vec<FieldBinding>,
}

impl EntityDescriptor {
    /// A descriptor whose records carry a type tag
    pub fn typed<N: Into<String>, T: Into<NodeRef>>(name: N, type_tag: T) -> Self {
        Self {
            name: name.into(),
            type_tag: Some(type_tag.into()),
            fields: Vec::new(),
        }
    }

    /// A read-only view over records of other types
    pub fn projection<N: Into<String>>(name: N) -> Self {
        Self {
            name: name.into(),
            type_tag: None,
            fields: Vec::new(),
        }
    }

    /// Builder: add a field
    pub fn field(mut self, binding: FieldBinding) -> Self {
        self.fields.push(binding);
        self
    }

    /// Look up a field binding by name
    pub fn binding(&self, name: &str) -> Option<&FieldBinding> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Returns true for projections
    pub fn is_projection(&self) -> bool {
        self.type_tag.is_none()
    }

    /// Fields that are decoded, in declaration order
    pub fn readable_fields(&self) -> impl Iterator<Item = &FieldBinding> {
        self.fields.iter().filter(|f| !f.excluded)
    }

    /// Check the descriptor is internally consistent
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::Validation("descriptor has an empty name".to_string()));
        }

        let mut seen = HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(Error::Validation(format!(
                    "{} declares field {} twice",
                    self.name, field.name
                )));
            }
            if field.predicate.is_empty() {
                return Err(Error::Validation(format!(
                    "{}.{} has an empty predicate",
                    self.name, field.name
                )));
            }
            if field.direction == Direction::Reverse && matches!(field.kind, FieldKind::Scalar(_)) {
                return Err(Error::Validation(format!(
                    "{}.{} is a reverse link and must refer to nodes or records",
                    self.name, field.name
                )));
            }
        }
        Ok(())
    }
}
