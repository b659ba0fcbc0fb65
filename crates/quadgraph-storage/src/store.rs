//! The quad store boundary
//!
//! Everything above the storage layer talks to a store through
//! [`QuadStore`]. Stores have set semantics: adding a quad that already
//! exists, or removing one that does not, is a no-op.

use quadgraph_core::{Error, NodeRef, Quad, QuadPattern, Result, Value};
use std::sync::Arc;

/// A lazily evaluated sequence of quads
///
/// Store cursors are released when the iterator is dropped.
pub type QuadIter<'a> = Box<dyn Iterator<Item = Result<Quad>> + 'a>;

/// A set of additions and removals applied as one unit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delta {
    /// Quads to insert
    pub adds: Vec<Quad>,

    /// Quads to delete; applied before `adds`
    pub removes: Vec<Quad>,
}

impl Delta {
    /// Create an empty delta
    pub fn new() -> Self {
        Self::default()
    }

    /// Delta that only inserts
    pub fn adding(adds: Vec<Quad>) -> Self {
        Self {
            adds,
            removes: Vec::new(),
        }
    }

    /// Delta that only deletes
    pub fn removing(removes: Vec<Quad>) -> Self {
        Self {
            adds: Vec::new(),
            removes,
        }
    }

    /// Total number of writes
    pub fn len(&self) -> usize {
        self.adds.len() + self.removes.len()
    }

    /// Returns true if nothing would be written
    pub fn is_empty(&self) -> bool {
        self.adds.is_empty() && self.removes.is_empty()
    }
}

/// Storage interface consumed by the query and schema layers
pub trait QuadStore: Send + Sync {
    /// Iterate every quad in store order
    fn quads_all(&self) -> Result<QuadIter<'_>>;

    /// Iterate the quads matching a pattern
    ///
    /// Backends with indices override this; the default filters a full scan.
    fn quads_matching(&self, pattern: &QuadPattern) -> Result<QuadIter<'_>> {
        let pattern = pattern.clone();
        let iter = self.quads_all()?;
        Ok(Box::new(iter.filter(move |item| {
            item.as_ref().map_or(true, |quad| pattern.matches(quad))
        })))
    }

    /// Apply all removals, then all additions, atomically
    fn apply_transaction(&self, delta: &Delta) -> Result<()>;

    /// Insert a single quad
    fn add_quad(&self, quad: Quad) -> Result<()> {
        self.apply_transaction(&Delta::adding(vec![quad]))
    }

    /// Delete a single quad
    fn remove_quad(&self, quad: Quad) -> Result<()> {
        self.apply_transaction(&Delta::removing(vec![quad]))
    }

    /// Check whether an exact quad, label included, is stored
    fn contains(&self, quad: &Quad) -> Result<bool> {
        let pattern = QuadPattern::any()
            .subject(quad.subject.clone())
            .predicate(quad.predicate.clone())
            .object(quad.object.clone());
        for item in self.quads_matching(&pattern)? {
            if item? == *quad {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Resolve a value to a node known to the store
    ///
    /// Fails with `NodeNotFound` if the value is not a node or the node
    /// does not participate in any quad as subject, predicate or object.
    fn lookup_node(&self, value: &Value) -> Result<NodeRef> {
        let node = value
            .as_node()
            .ok_or_else(|| Error::NodeNotFound(value.to_string()))?;

        let probes = [
            QuadPattern::any().subject(node.clone()),
            QuadPattern::any().predicate(node.clone()),
            QuadPattern::any().object(node.clone()),
        ];
        for pattern in &probes {
            if let Some(item) = self.quads_matching(pattern)?.next() {
                item?;
                return Ok(node.clone());
            }
        }
        Err(Error::NodeNotFound(node.to_string()))
    }

    /// Count stored quads
    fn len(&self) -> Result<usize> {
        let mut count = 0;
        for item in self.quads_all()? {
            item?;
            count += 1;
        }
        Ok(count)
    }

    /// Returns true if no quads are stored
    fn is_empty(&self) -> Result<bool> {
        Ok(self.quads_all()?.next().transpose()?.is_none())
    }
}

impl<S: QuadStore + ?Sized> QuadStore for Arc<S> {
    fn quads_all(&self) -> Result<QuadIter<'_>> {
        (**self).quads_all()
    }

    fn quads_matching(&self, pattern: &QuadPattern) -> Result<QuadIter<'_>> {
        (**self).quads_matching(pattern)
    }

    fn apply_transaction(&self, delta: &Delta) -> Result<()> {
        (**self).apply_transaction(delta)
    }
}
