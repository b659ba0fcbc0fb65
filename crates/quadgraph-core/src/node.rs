//! Node references
//!
//! A node is named either by an IRI-like string or by a blank (anonymous)
//! identifier. Node identity is the canonical string form and nothing else.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A reference to a node in the quad store
///
/// The canonical form is `<name>` for IRIs and `_:name` for blank nodes.
/// Two references are equal iff their canonical forms are equal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NodeRef {
    /// A stable, externally meaningful name
    Iri(String),

    /// An anonymous identifier local to the store
    Blank(String),
}

impl NodeRef {
    /// Create an IRI node
    pub fn iri<S: Into<String>>(name: S) -> Self {
        NodeRef::Iri(name.into())
    }

    /// Create a blank node
    pub fn blank<S: Into<String>>(name: S) -> Self {
        NodeRef::Blank(name.into())
    }

    /// The bare name, without the canonical decoration
    pub fn name(&self) -> &str {
        match self {
            NodeRef::Iri(name) | NodeRef::Blank(name) => name,
        }
    }

    /// Returns true for blank nodes
    pub fn is_blank(&self) -> bool {
        matches!(self, NodeRef::Blank(_))
    }

    /// Returns true if the name is empty
    pub fn is_empty(&self) -> bool {
        self.name().is_empty()
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeRef::Iri(name) => write!(f, "<{}>", name),
            NodeRef::Blank(name) => write!(f, "_:{}", name),
        }
    }
}

impl FromStr for NodeRef {
    type Err = std::convert::Infallible;

    /// Parse a canonical form; undecorated input is taken as an IRI
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(name) = s.strip_prefix("_:") {
            return Ok(NodeRef::blank(name));
        }
        if let Some(name) = s.strip_prefix('<').and_then(|rest| rest.strip_suffix('>')) {
            return Ok(NodeRef::iri(name));
        }
        Ok(NodeRef::iri(s))
    }
}

impl From<&str> for NodeRef {
    fn from(s: &str) -> Self {
        NodeRef::iri(s)
    }
}

impl From<String> for NodeRef {
    fn from(s: String) -> Self {
        NodeRef::Iri(s)
    }
}

/// Well-known nodes used by the schema layer
pub mod vocab {
    use super::NodeRef;

    /// Predicate linking a record node to its type tag
    pub const RDF_TYPE: &str = "rdf:type";

    const SLOT_PREFIX: &str = "slot";

    /// The `rdf:type` predicate
    pub fn rdf_type() -> NodeRef {
        NodeRef::iri(RDF_TYPE)
    }

    /// Label carrying the ordinal of an element in a repeated field
    pub fn slot(ordinal: usize) -> NodeRef {
        NodeRef::blank(format!("{}{}", SLOT_PREFIX, ordinal))
    }

    /// Recover the ordinal from a slot label
    pub fn slot_ordinal(label: &NodeRef) -> Option<usize> {
        match label {
            NodeRef::Blank(name) => name.strip_prefix(SLOT_PREFIX)?.parse().ok(),
            NodeRef::Iri(_) => None,
        }
    }
}
