//! In-memory quad store
//!
//! Quads live in an ordered map keyed by their `spo` key, held behind an
//! `Arc` so readers iterate a stable snapshot while a commit builds the next
//! version on a private copy.

use crate::keys::{Index, ScanPlan};
use crate::store::{Delta, QuadIter, QuadStore};
use quadgraph_core::{Error, Quad, QuadPattern, Result};
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, warn};

type QuadMap = BTreeMap<Vec<u8>, Quad>;

fn poisoned<T>(_: T) -> Error {
    Error::StoreUnavailable("memory store lock poisoned".to_string())
}

/// Volatile quad store for tests and short-lived graphs
#[derive(Debug, Default)]
pub struct MemoryStore {
    quads: RwLock<Arc<QuadMap>>,
    fault: Mutex<Option<usize>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next commit fail after `after_writes` individual writes
    ///
    /// The failure is one-shot. Writes performed before it are discarded
    /// along with the rest of the commit.
    pub fn inject_commit_failure(&self, after_writes: usize) -> Result<()> {
        *self.fault.lock().map_err(poisoned)? = Some(after_writes);
        Ok(())
    }

    fn snapshot(&self) -> Result<Arc<QuadMap>> {
        Ok(Arc::clone(&*self.quads.read().map_err(poisoned)?))
    }

    fn scan(&self, pattern: QuadPattern) -> Result<QuadIter<'_>> {
        let plan = ScanPlan::for_pattern(&pattern);
        // Only the spo ordering is materialised here
        let prefix = match plan.index {
            Index::Spo => plan.prefix,
            Index::Pos | Index::Osp => ScanPlan::for_pattern(&QuadPattern::any()).prefix,
        };
        Ok(Box::new(SnapshotIter {
            snapshot: self.snapshot()?,
            cursor: Bound::Included(prefix.clone()),
            prefix,
            pattern,
        }))
    }
}

impl QuadStore for MemoryStore {
    fn quads_all(&self) -> Result<QuadIter<'_>> {
        self.scan(QuadPattern::any())
    }

    fn quads_matching(&self, pattern: &QuadPattern) -> Result<QuadIter<'_>> {
        self.scan(pattern.clone())
    }

    fn apply_transaction(&self, delta: &Delta) -> Result<()> {
        let mut fault = self.fault.lock().map_err(poisoned)?.take();
        let mut guard = self.quads.write().map_err(poisoned)?;
        let mut working = QuadMap::clone(&guard);

        let mut tick = || match fault.as_mut() {
            Some(0) => {
                warn!("Injected commit failure");
                Err(Error::StoreUnavailable("injected commit failure".to_string()))
            }
            Some(remaining) => {
                *remaining -= 1;
                Ok(())
            }
            None => Ok(()),
        };

        for quad in &delta.removes {
            tick()?;
            working.remove(&Index::Spo.key(quad));
        }
        for quad in &delta.adds {
            quad.validate()?;
            tick()?;
            working.insert(Index::Spo.key(quad), quad.clone());
        }

        *guard = Arc::new(working);
        debug!(
            "Applied {} additions and {} removals",
            delta.adds.len(),
            delta.removes.len()
        );
        Ok(())
    }

    fn len(&self) -> Result<usize> {
        Ok(self.snapshot()?.len())
    }
}

/// Lazy cursor over one store version
struct SnapshotIter {
    snapshot: Arc<QuadMap>,
    cursor: Bound<Vec<u8>>,
    prefix: Vec<u8>,
    pattern: QuadPattern,
}

impl Iterator for SnapshotIter {
    type Item = Result<Quad>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (key, quad) = self
                .snapshot
                .range((self.cursor.clone(), Bound::Unbounded))
                .next()?;
            if !key.starts_with(&self.prefix) {
                return None;
            }
            let found = self.pattern.matches(quad).then(|| quad.clone());
            self.cursor = Bound::Excluded(key.clone());
            if let Some(quad) = found {
                return Some(Ok(quad));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quadgraph_core::NodeRef;

    fn node(name: &str) -> NodeRef {
        NodeRef::iri(name)
    }

    fn collect(iter: QuadIter<'_>) -> Vec<Quad> {
        iter.collect::<Result<Vec<_>>>().unwrap()
    }

    #[test]
    fn test_set_semantics() {
        let store = MemoryStore::new();
        let quad = Quad::new(node("alice"), "name", "alice");

        store.add_quad(quad.clone()).unwrap();
        store.add_quad(quad.clone()).unwrap();
        assert_eq!(store.len().unwrap(), 1);

        store.remove_quad(quad.clone()).unwrap();
        store.remove_quad(quad).unwrap();
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_matching() {
        let store = MemoryStore::new();
        store
            .apply_transaction(&Delta::adding(vec![
                Quad::new(node("p1"), "author", node("bob")),
                Quad::new(node("p2"), "author", node("bob")),
                Quad::new(node("bob"), "name", "bob"),
            ]))
            .unwrap();

        let by_subject = collect(store.quads_matching(&QuadPattern::any().subject(node("bob"))).unwrap());
        assert_eq!(by_subject.len(), 1);

        let by_object = collect(store.quads_matching(&QuadPattern::any().object(node("bob"))).unwrap());
        assert_eq!(by_object.len(), 2);
    }

    #[test]
    fn test_injected_failure_leaves_store_untouched() {
        let store = MemoryStore::new();
        let existing = Quad::new(node("c1"), "name", "Healthy Life");
        store.add_quad(existing.clone()).unwrap();

        store.inject_commit_failure(2).unwrap();
        let delta = Delta {
            adds: vec![
                Quad::new(node("a"), "x", 1i64),
                Quad::new(node("b"), "x", 2i64),
                Quad::new(node("c"), "x", 3i64),
            ],
            removes: vec![existing.clone()],
        };
        let result = store.apply_transaction(&delta);
        assert!(matches!(result, Err(Error::StoreUnavailable(_))));
        assert_eq!(collect(store.quads_all().unwrap()), vec![existing]);

        // One-shot
        store.apply_transaction(&delta).unwrap();
        assert_eq!(store.len().unwrap(), 3);
    }

    #[test]
    fn test_readers_keep_their_snapshot() {
        let store = MemoryStore::new();
        store.add_quad(Quad::new(node("a"), "x", 1i64)).unwrap();

        let iter = store.quads_all().unwrap();
        store.add_quad(Quad::new(node("b"), "x", 2i64)).unwrap();

        assert_eq!(collect(iter).len(), 1);
        assert_eq!(store.len().unwrap(), 2);
    }

    #[test]
    fn test_subject_prefix_is_exact() {
        let store = MemoryStore::new();
        store.add_quad(Quad::new(node("bob"), "name", "bob")).unwrap();
        store.add_quad(Quad::new(node("bobby"), "name", "bobby")).unwrap();

        let quads = collect(store.quads_matching(&QuadPattern::any().subject(node("bob"))).unwrap());
        assert_eq!(quads.len(), 1);
    }
}
