//! Quads and quad patterns

use crate::error::{Error, Result};
use crate::node::NodeRef;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single statement: `(subject, predicate, object, label)`
///
/// Quads are immutable once written; an update is a removal followed by an
/// insertion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Quad {
    /// Node the statement is about
    pub subject: NodeRef,

    /// Relation being asserted
    pub predicate: NodeRef,

    /// Value or node the subject is related to
    pub object: Value,

    /// Optional context label
    pub label: Option<NodeRef>,
}

impl Quad {
    /// Create an unlabelled quad
    pub fn new<P, O>(subject: NodeRef, predicate: P, object: O) -> Self
    where
        P: Into<NodeRef>,
        O: Into<Value>,
    {
        Self {
            subject,
            predicate: predicate.into(),
            object: object.into(),
            label: None,
        }
    }

    /// Attach a label
    pub fn with_label(mut self, label: NodeRef) -> Self {
        self.label = Some(label);
        self
    }

    /// Check that subject and predicate are named
    pub fn validate(&self) -> Result<()> {
        if self.subject.is_empty() {
            return Err(Error::Validation(format!("quad has an empty subject: {}", self)));
        }
        if self.predicate.is_empty() {
            return Err(Error::Validation(format!("quad has an empty predicate: {}", self)));
        }
        Ok(())
    }
}

impl fmt::Display for Quad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.subject, self.predicate, self.object)?;
        if let Some(label) = &self.label {
            write!(f, " {}", label)?;
        }
        write!(f, " .")
    }
}

/// A quad template; `None` positions match anything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuadPattern {
    pub subject: Option<NodeRef>,
    pub predicate: Option<NodeRef>,
    pub object: Option<Value>,
    pub label: Option<NodeRef>,
}

impl QuadPattern {
    /// Pattern matching every quad
    pub fn any() -> Self {
        Self::default()
    }

    /// Builder: bind the subject
    pub fn subject(mut self, subject: NodeRef) -> Self {
        self.subject = Some(subject);
        self
    }

    /// Builder: bind the predicate
    pub fn predicate(mut self, predicate: NodeRef) -> Self {
        self.predicate = Some(predicate);
        self
    }

    /// Builder: bind the object
    pub fn object<V: Into<Value>>(mut self, object: V) -> Self {
        self.object = Some(object.into());
        self
    }

    /// Builder: bind the label
    pub fn label(mut self, label: NodeRef) -> Self {
        self.label = Some(label);
        self
    }

    /// Check a quad against this pattern
    pub fn matches(&self, quad: &Quad) -> bool {
        self.subject.as_ref().is_none_or(|s| *s == quad.subject)
            && self.predicate.as_ref().is_none_or(|p| *p == quad.predicate)
            && self.object.as_ref().is_none_or(|o| *o == quad.object)
            && self
                .label
                .as_ref()
                .is_none_or(|l| quad.label.as_ref() == Some(l))
    }
}
