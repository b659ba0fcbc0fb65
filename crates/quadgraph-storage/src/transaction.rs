//! Transaction support for quad stores

use crate::store::{Delta, QuadStore};
use quadgraph_core::{Error, Quad, Result};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::debug;

static NEXT_TX_ID: AtomicU64 = AtomicU64::new(1);

/// Lifecycle of a [`Transaction`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Staging writes
    Active,
    Committed,
    /// Rolled back explicitly, by drop, or by a failed commit
    RolledBack,
}

/// A staged write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StagedWrite {
    Add(Quad),
    Remove(Quad),
}

/// Hands out transactions against one store, one at a time
///
/// The coordinator performs no conflict detection. Concurrent commits from
/// different coordinators are serialized by the store itself.
#[derive(Clone)]
pub struct TransactionCoordinator {
    store: Arc<dyn QuadStore>,
    open: Arc<AtomicBool>,
}

impl TransactionCoordinator {
    /// Create a coordinator for a store
    pub fn new(store: Arc<dyn QuadStore>) -> Self {
        Self {
            store,
            open: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start a transaction
    ///
    /// Fails with `TransactionAlreadyOpen` while another transaction from
    /// this coordinator is still active.
    pub fn begin(&self) -> Result<Transaction> {
        self.open
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| Error::TransactionAlreadyOpen)?;

        let tx = Transaction {
            id: NEXT_TX_ID.fetch_add(1, Ordering::Relaxed),
            store: Arc::clone(&self.store),
            slot: Arc::clone(&self.open),
            state: TransactionState::Active,
            operations: Vec::new(),
        };
        debug!("Transaction {} started", tx.id);
        Ok(tx)
    }

    /// Returns true while a transaction is active
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// The store transactions commit to
    pub fn store(&self) -> &Arc<dyn QuadStore> {
        &self.store
    }
}

/// A batch of quad additions and removals
///
/// Nothing is visible to readers until [`Transaction::commit`], which applies
/// the batch as a single atomic store write. Dropping an active transaction
/// rolls it back.
pub struct Transaction {
    id: u64,

    store: Arc<dyn QuadStore>,

    /// Open flag of the coordinator that issued this transaction
    slot: Arc<AtomicBool>,

    state: TransactionState,

    /// Writes in staging order
    operations: Vec<StagedWrite>,
}

impl Transaction {
    /// Process-unique sequence number, for logs
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == TransactionState::Active
    }

    fn check_active(&self) -> Result<()> {
        match self.state {
            TransactionState::Active => Ok(()),
            state => Err(Error::TransactionAborted(format!(
                "transaction {} is {:?}",
                self.id, state
            ))),
        }
    }

    fn finish(&mut self, state: TransactionState) {
        self.state = state;
        self.operations.clear();
        self.slot.store(false, Ordering::Release);
    }

    // ========== Quad Operations ==========

    /// Stage a quad for insertion
    pub fn add(&mut self, quad: Quad) -> Result<()> {
        self.check_active()?;
        quad.validate()?;
        self.operations.push(StagedWrite::Add(quad));
        Ok(())
    }

    /// Stage a quad for removal
    pub fn remove(&mut self, quad: Quad) -> Result<()> {
        self.check_active()?;
        self.operations.push(StagedWrite::Remove(quad));
        Ok(())
    }

    /// Stage several insertions
    pub fn extend_add<I: IntoIterator<Item = Quad>>(&mut self, quads: I) -> Result<()> {
        for quad in quads {
            self.add(quad)?;
        }
        Ok(())
    }

    /// Stage several removals
    pub fn extend_remove<I: IntoIterator<Item = Quad>>(&mut self, quads: I) -> Result<()> {
        for quad in quads {
            self.remove(quad)?;
        }
        Ok(())
    }

    /// Net effect of the staged operations
    ///
    /// When a quad is staged more than once, the last operation wins.
    pub fn delta(&self) -> Delta {
        let mut last: HashMap<&Quad, usize> = HashMap::new();
        for (i, op) in self.operations.iter().enumerate() {
            let quad = match op {
                StagedWrite::Add(q) | StagedWrite::Remove(q) => q,
            };
            last.insert(quad, i);
        }

        let mut delta = Delta::new();
        for (i, op) in self.operations.iter().enumerate() {
            match op {
                StagedWrite::Add(q) if last[q] == i => delta.adds.push(q.clone()),
                StagedWrite::Remove(q) if last[q] == i => delta.removes.push(q.clone()),
                _ => {}
            }
        }
        delta
    }

    // ========== Completion ==========

    /// Apply every staged write as one atomic store write
    ///
    /// On failure nothing is applied and the transaction ends rolled back.
    pub fn commit(mut self) -> Result<()> {
        self.check_active()?;

        let delta = self.delta();
        let result = if delta.is_empty() {
            Ok(())
        } else {
            self.store.apply_transaction(&delta)
        };

        match result {
            Ok(()) => {
                debug!("Transaction {} committed {} writes", self.id, delta.len());
                self.finish(TransactionState::Committed);
                Ok(())
            }
            Err(e) => {
                debug!("Transaction {} failed: {}", self.id, e);
                self.finish(TransactionState::RolledBack);
                Err(e)
            }
        }
    }

    /// Discard every staged write
    pub fn rollback(mut self) -> Result<()> {
        self.check_active()?;
        self.finish(TransactionState::RolledBack);
        debug!("Transaction {} rolled back", self.id);
        Ok(())
    }

    /// Number of writes staged so far, before last-write-wins folding
    pub fn pending_operations(&self) -> usize {
        self.operations.len()
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if self.is_active() {
            debug!("Transaction {} dropped while active", self.id);
            self.finish(TransactionState::RolledBack);
        }
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("operations", &self.operations)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use quadgraph_core::NodeRef;

    fn setup() -> (Arc<MemoryStore>, TransactionCoordinator) {
        let store = Arc::new(MemoryStore::new());
        let coordinator = TransactionCoordinator::new(store.clone());
        (store, coordinator)
    }

    fn quad(s: &str, p: &str, o: &str) -> Quad {
        Quad::new(NodeRef::iri(s), p, o)
    }

    #[test]
    fn test_commit_applies_staged_writes() {
        let (store, coordinator) = setup();

        let mut tx = coordinator.begin().unwrap();
        assert!(tx.is_active());
        tx.add(quad("c1", "name", "Healthy Life")).unwrap();
        tx.add(quad("c1", "address", "Sesame st")).unwrap();
        assert_eq!(tx.pending_operations(), 2);

        // Not visible before commit
        assert!(store.is_empty().unwrap());

        tx.commit().unwrap();
        assert_eq!(store.len().unwrap(), 2);
        assert!(!coordinator.is_open());
    }

    #[test]
    fn test_rollback_discards_staged_writes() {
        let (store, coordinator) = setup();

        let mut tx = coordinator.begin().unwrap();
        tx.add(quad("c1", "name", "Healthy Life")).unwrap();
        tx.rollback().unwrap();

        assert!(store.is_empty().unwrap());
        assert!(!coordinator.is_open());
    }

    #[test]
    fn test_second_begin_is_rejected() {
        let (_store, coordinator) = setup();

        let tx = coordinator.begin().unwrap();
        assert!(matches!(coordinator.begin(), Err(Error::TransactionAlreadyOpen)));

        drop(tx);
        assert!(coordinator.begin().is_ok());
    }

    #[test]
    fn test_update_in_one_transaction() {
        let (store, coordinator) = setup();
        let old = quad("c1", "address", "Sesame st");
        store.add_quad(old.clone()).unwrap();

        let mut tx = coordinator.begin().unwrap();
        tx.remove(old.clone()).unwrap();
        tx.add(quad("c1", "address", "Elm st")).unwrap();
        tx.commit().unwrap();

        assert!(!store.contains(&old).unwrap());
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn test_last_operation_wins() {
        let (_store, coordinator) = setup();
        let q = quad("a", "x", "1");

        let mut tx = coordinator.begin().unwrap();
        tx.add(q.clone()).unwrap();
        tx.remove(q.clone()).unwrap();
        tx.add(q.clone()).unwrap();

        let delta = tx.delta();
        assert_eq!(delta.adds, vec![q]);
        assert!(delta.removes.is_empty());
    }

    #[test]
    fn test_failed_commit_applies_nothing() {
        let (store, coordinator) = setup();
        store.inject_commit_failure(2).unwrap();

        let mut tx = coordinator.begin().unwrap();
        tx.extend_add(vec![quad("a", "x", "1"), quad("b", "x", "2"), quad("c", "x", "3")])
            .unwrap();
        assert!(matches!(tx.commit(), Err(Error::StoreUnavailable(_))));

        assert!(store.is_empty().unwrap());
        assert!(!coordinator.is_open());
    }

    #[test]
    fn test_invalid_quad_is_rejected_when_staged() {
        let (_store, coordinator) = setup();
        let mut tx = coordinator.begin().unwrap();
        assert!(matches!(tx.add(quad("", "x", "1")), Err(Error::Validation(_))));
        assert_eq!(tx.pending_operations(), 0);
    }
}
