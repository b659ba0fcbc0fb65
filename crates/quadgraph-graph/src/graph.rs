//! Graph handle implementation

use crate::config::{Backend, GraphConfig};
use quadgraph_core::{
    Error, IdGenerator, NodeRef, Quad, QuadPattern, Result, UuidGenerator, Value,
};
use quadgraph_query::{Path, QueryExecutor};
use quadgraph_schema::{Entity, EntityDescriptor, SchemaMapper, TypeRegistry};
use quadgraph_storage::{
    Delta, MemoryStore, QuadStore, RocksStore, Transaction, TransactionCoordinator,
};
use std::collections::HashSet;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

fn lock_err<T>(_: T) -> Error {
    Error::StoreUnavailable("Failed to acquire schema lock".to_string())
}

/// A quad store with typed record access
///
/// Clones share the store, the registered types and the transaction slot.
/// Record writes commit their own delta and never take the slot, so they
/// may run from several threads at once.
#[derive(Clone)]
pub struct Graph {
    /// Quad store
    store: Arc<dyn QuadStore>,

    /// Record mapping and registered types
    mapper: Arc<RwLock<SchemaMapper>>,

    /// Transaction slot for this handle
    transactions: TransactionCoordinator,
}

impl Graph {
    /// Create a graph over an existing store
    pub fn new(store: Arc<dyn QuadStore>, ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            transactions: TransactionCoordinator::new(Arc::clone(&store)),
            mapper: Arc::new(RwLock::new(SchemaMapper::new(TypeRegistry::new(), ids))),
            store,
        }
    }

    /// Open a graph as configured
    pub fn open(config: &GraphConfig) -> Result<Self> {
        let store: Arc<dyn QuadStore> = match (&config.backend, config.storage_options()) {
            (Backend::RocksDb { .. }, Some(options)) => Arc::new(RocksStore::open(options)?),
            _ => Arc::new(MemoryStore::new()),
        };
        let ids = Arc::new(UuidGenerator::with_style(config.id_style));

        info!("Opened graph with {:?} backend", config.backend);
        Ok(Self::new(store, ids))
    }

    /// An empty in-memory graph
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()), Arc::new(UuidGenerator::new()))
    }

    /// Get a reference to the quad store
    pub fn store(&self) -> &Arc<dyn QuadStore> {
        &self.store
    }

    // ========== Types ==========

    /// Register a record type and the types it nests
    ///
    /// Registering again replaces the earlier descriptors.
    pub fn register<T: Entity>(&self) -> Result<()> {
        let mut mapper = self.mapper.write().map_err(lock_err)?;
        for nested in T::nested_descriptors() {
            mapper.register(nested)?;
        }
        mapper.register(T::descriptor())
    }

    /// Descriptor for `T`, registering it on first use
    fn descriptor_of<T: Entity>(&self) -> Result<Arc<EntityDescriptor>> {
        let name = T::descriptor().name;
        {
            let mapper = self.mapper.read().map_err(lock_err)?;
            if mapper.registry().contains(&name) {
                return mapper.descriptor(&name);
            }
        }
        self.register::<T>()?;
        self.mapper.read().map_err(lock_err)?.descriptor(&name)
    }

    // ========== Writes ==========

    /// Write a new record
    ///
    /// Assigns an identifier if the record has none and stores it back into
    /// `entity`.
    pub fn insert<T: Entity>(&self, entity: &mut T) -> Result<NodeRef> {
        let descriptor = self.descriptor_of::<T>()?;
        let mut record = entity.to_record();
        let (quads, id) = self
            .mapper
            .read()
            .map_err(lock_err)?
            .encode(&mut record, &descriptor)?;

        self.commit(Delta::adding(quads))?;

        entity.set_id(id.clone());
        debug!("Inserted {} {}", descriptor.name, id);
        Ok(id)
    }

    /// Replace the stored revision of a record
    ///
    /// The previous quads of the record, nested records included, are
    /// removed in the same transaction that adds the new ones.
    pub fn update<T: Entity>(&self, entity: &T) -> Result<()> {
        let id = entity
            .id()
            .cloned()
            .ok_or_else(|| Error::Validation("cannot update a record without an id".to_string()))?;
        let descriptor = self.descriptor_of::<T>()?;

        let mut record = entity.to_record();
        record.id = Some(id.clone());

        let (old, new) = {
            let mapper = self.mapper.read().map_err(lock_err)?;
            let old = mapper.owned_quads(self.store.as_ref(), &id, &descriptor)?;
            let (new, _) = mapper.encode(&mut record, &descriptor)?;
            (old, new)
        };

        self.commit(Delta {
            adds: new,
            removes: old,
        })?;

        debug!("Updated {} {}", descriptor.name, id);
        Ok(())
    }

    /// Delete a record, its nested records and every edge pointing at it
    ///
    /// Returns the number of quads removed.
    pub fn delete<T: Entity>(&self, id: &NodeRef) -> Result<usize> {
        let descriptor = self.descriptor_of::<T>()?;
        let mut doomed = self
            .mapper
            .read()
            .map_err(lock_err)?
            .owned_quads(self.store.as_ref(), id, &descriptor)?;
        doomed.extend(self.quads_matching(&QuadPattern::any().object(id.clone()))?);

        self.remove_all(doomed)
    }

    /// Remove every quad in which `node` is the subject or the object
    ///
    /// Returns the number of quads removed.
    pub fn remove_node(&self, node: &NodeRef) -> Result<usize> {
        let mut doomed = self.quads_matching(&QuadPattern::any().subject(node.clone()))?;
        doomed.extend(self.quads_matching(&QuadPattern::any().object(node.clone()))?);

        self.remove_all(doomed)
    }

    fn remove_all(&self, quads: Vec<Quad>) -> Result<usize> {
        let mut seen = HashSet::new();
        let quads: Vec<Quad> = quads.into_iter().filter(|q| seen.insert(q.clone())).collect();
        let count = quads.len();

        self.commit(Delta::removing(quads))?;

        debug!("Removed {} quads", count);
        Ok(count)
    }

    /// Apply one record write as a single atomic unit
    fn commit(&self, delta: Delta) -> Result<()> {
        if delta.is_empty() {
            return Ok(());
        }
        self.store.apply_transaction(&delta)
    }

    // ========== Reads ==========

    /// Load the record stored at `id`
    pub fn load<T: Entity>(&self, id: &NodeRef) -> Result<T> {
        let descriptor = self.descriptor_of::<T>()?;
        let record = self
            .mapper
            .read()
            .map_err(lock_err)?
            .decode(self.store.as_ref(), id, &descriptor)?;
        T::from_record(&record)
    }

    /// Load every record of a type
    ///
    /// For projection types, candidates lacking a required field are left
    /// out rather than reported.
    pub fn load_all<T: Entity>(&self) -> Result<Vec<T>> {
        let descriptor = self.descriptor_of::<T>()?;
        let records = self
            .mapper
            .read()
            .map_err(lock_err)?
            .decode_all(self.store.as_ref(), &descriptor)?;
        records.iter().map(T::from_record).collect()
    }

    /// Load the record at each node a path ends on
    pub fn load_path<T: Entity>(&self, path: &Path) -> Result<Vec<T>> {
        let descriptor = self.descriptor_of::<T>()?;
        let records = self
            .mapper
            .read()
            .map_err(lock_err)?
            .decode_path(self.store.as_ref(), path, &descriptor)?;
        records.iter().map(T::from_record).collect()
    }

    /// Load the record at the first node a path ends on
    pub fn load_first<T: Entity>(&self, path: &Path) -> Result<Option<T>> {
        let first = Path::clone(path).limit(1);
        Ok(self.load_path::<T>(&first)?.into_iter().next())
    }

    /// Every stored quad, in store order
    pub fn quads(&self) -> Result<Vec<Quad>> {
        self.store.quads_all()?.collect()
    }

    /// Stored quads matching a pattern
    pub fn quads_matching(&self, pattern: &QuadPattern) -> Result<Vec<Quad>> {
        self.store.quads_matching(pattern)?.collect()
    }

    /// Resolve a value to a node known to the store
    pub fn lookup_node(&self, value: &Value) -> Result<NodeRef> {
        self.store.lookup_node(value)
    }

    /// Evaluate paths against this graph
    pub fn query(&self) -> QueryExecutor<'_> {
        QueryExecutor::new(self.store.as_ref())
    }

    /// Start a transaction on this handle
    ///
    /// A second `begin` fails with `TransactionAlreadyOpen` until the first is
    /// committed, rolled back or dropped. Record writes are not blocked.
    pub fn begin(&self) -> Result<Transaction> {
        self.transactions.begin()
    }
}
