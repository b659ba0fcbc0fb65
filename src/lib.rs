//! QuadGraph - typed records over a quad store
//!
//! This is the facade crate that re-exports all QuadGraph layers.

pub use quadgraph_core as core;
pub use quadgraph_graph as graph;
pub use quadgraph_query as query;
pub use quadgraph_schema as schema;
pub use quadgraph_storage as storage;

// Re-export commonly used types
pub use quadgraph_core::{Error, IdGenerator, NodeRef, Quad, QuadPattern, Result, UuidGenerator, Value};
pub use quadgraph_graph::{Graph, GraphConfig};
pub use quadgraph_query::{Path, QueryExecutor, Row};
pub use quadgraph_schema::{Decodable, Encodable, Entity, EntityDescriptor, FieldBinding, Record};
pub use quadgraph_storage::{MemoryStore, QuadStore, RocksStore, StorageOptions, Transaction};
