//! QuadGraph Storage
//!
//! Provides the quad store boundary and its implementations.
//!
//! # Architecture
//!
//! The storage layer is organized into:
//! - The [`QuadStore`] trait every backend implements
//! - A persistent RocksDB backend and an in-memory backend
//! - Order-preserving key encoding for the quad indices
//! - A transaction coordinator that stages adds and removes
//!
//! # Column Families
//!
//! - `spo` - quads keyed subject, predicate, object
//! - `pos` - quads keyed predicate, object, subject
//! - `osp` - quads keyed object, subject, predicate
//! - `meta` - store metadata

pub mod engine;
pub mod keys;
pub mod memory;
pub mod options;
pub mod store;
pub mod transaction;

pub use engine::RocksStore;
pub use memory::MemoryStore;
pub use options::{Compression, Durability, StorageOptions};
pub use store::{Delta, QuadIter, QuadStore};
pub use transaction::{Transaction, TransactionCoordinator, TransactionState};
