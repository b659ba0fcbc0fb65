//! Quad store implementation using RocksDB

use crate::keys::{Index, KeyBuilder, ScanPlan};
use crate::options::{Durability, StorageOptions};
use crate::store::{Delta, QuadIter, QuadStore};
use quadgraph_core::{Error, Quad, QuadPattern, Result};
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, Options, WriteBatch, WriteOptions};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Column family names
pub mod cf {
    pub const SPO: &str = "spo";
    pub const POS: &str = "pos";
    pub const OSP: &str = "osp";
    pub const META: &str = "meta";
}

/// All column families used by the quad store
pub const COLUMN_FAMILIES: &[&str] = &[cf::SPO, cf::POS, cf::OSP, cf::META];

const FORMAT_KEY: &str = "format_version";
const FORMAT_VERSION: &[u8] = b"1";

fn store_err(e: rocksdb::Error) -> Error {
    Error::StoreUnavailable(e.to_string())
}

fn encode_quad(quad: &Quad) -> Result<Vec<u8>> {
    bincode::serialize(quad).map_err(|e| Error::Serialization(e.to_string()))
}

fn decode_quad(bytes: &[u8]) -> Result<Quad> {
    bincode::deserialize(bytes)
        .map_err(|e| Error::StoreUnavailable(format!("corrupt quad payload: {}", e)))
}

/// Persistent quad store
///
/// Each quad is written under three keys (`spo`, `pos`, `osp`) so any
/// pattern with a bound position is answered by a prefix scan. All writes go
/// through a single `WriteBatch` and are therefore atomic.
pub struct RocksStore {
    db: Arc<DB>,
    options: StorageOptions,
}

impl RocksStore {
    /// Open or create a quad store
    pub fn open(options: StorageOptions) -> Result<Self> {
        info!("Opening quad store at {:?}", options.path);

        let mut db_opts = Options::default();
        db_opts.create_if_missing(options.create_if_missing);
        db_opts.create_missing_column_families(true);
        db_opts.set_write_buffer_size(options.write_buffer_size);
        db_opts.set_max_write_buffer_number(options.max_write_buffers);
        db_opts.set_max_background_jobs(options.background_jobs);

        let cf_descriptors: Vec<ColumnFamilyDescriptor> = COLUMN_FAMILIES
            .iter()
            .map(|name| {
                let mut cf_opts = Options::default();
                cf_opts.set_compression_type(options.compression.to_rocksdb());
                if let Some(bits) = options.bloom_bits_per_key {
                    let mut table = rocksdb::BlockBasedOptions::default();
                    table.set_bloom_filter(bits, false);
                    cf_opts.set_block_based_table_factory(&table);
                }
                ColumnFamilyDescriptor::new(*name, cf_opts)
            })
            .collect();

        let db = DB::open_cf_descriptors(&db_opts, &options.path, cf_descriptors).map_err(store_err)?;

        let store = Self {
            db: Arc::new(db),
            options,
        };
        store.check_format()?;

        info!("Quad store opened successfully");
        Ok(store)
    }

    /// Directory the store lives in
    pub fn path(&self) -> &Path {
        &self.options.path
    }

    fn check_format(&self) -> Result<()> {
        match self.get_meta(FORMAT_KEY)? {
            None => self.put_meta(FORMAT_KEY, FORMAT_VERSION),
            Some(version) if version == FORMAT_VERSION => Ok(()),
            Some(version) => Err(Error::Configuration(format!(
                "unsupported store format {:?} at {:?}",
                String::from_utf8_lossy(&version),
                self.options.path
            ))),
        }
    }

    /// Get a reference to a column family
    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::StoreUnavailable(format!("Column family not found: {}", name)))
    }

    fn index_cf(&self, index: Index) -> Result<&ColumnFamily> {
        self.cf(match index {
            Index::Spo => cf::SPO,
            Index::Pos => cf::POS,
            Index::Osp => cf::OSP,
        })
    }

    fn write_options(&self) -> WriteOptions {
        let mut write_opts = WriteOptions::default();
        match self.options.durability {
            Durability::Unlogged => write_opts.disable_wal(true),
            Durability::Logged => write_opts.set_sync(false),
            Durability::Synced => write_opts.set_sync(true),
        }
        write_opts
    }

    fn scan(&self, plan: ScanPlan) -> Result<QuadIter<'_>> {
        let cf = self.index_cf(plan.index)?;
        let prefix = plan.prefix;
        let iter = self.db.prefix_iterator_cf(cf, &prefix);

        Ok(Box::new(
            iter.take_while(move |item| match item {
                Ok((key, _)) => key.starts_with(&prefix),
                Err(_) => true,
            })
            .map(|item| {
                let (_, value) = item.map_err(store_err)?;
                decode_quad(&value)
            }),
        ))
    }

    // ========== Metadata ==========

    /// Write a metadata entry outside any transaction
    pub fn put_meta(&self, key: &str, value: &[u8]) -> Result<()> {
        let storage_key = KeyBuilder::meta(key);
        let cf = self.cf(cf::META)?;

        self.db
            .put_cf_opt(cf, &storage_key, value, &self.write_options())
            .map_err(store_err)
    }

    pub fn get_meta(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let storage_key = KeyBuilder::meta(key);
        let cf = self.cf(cf::META)?;

        self.db.get_cf(cf, &storage_key).map_err(store_err)
    }

    // ========== Maintenance ==========

    /// Flush every memtable to disk
    pub fn flush(&self) -> Result<()> {
        for name in COLUMN_FAMILIES {
            let cf = self.cf(name)?;
            self.db.flush_cf(cf).map_err(store_err)?;
        }
        info!("Quad store flushed");
        Ok(())
    }

    /// Compact the index column families, dropping deleted quads
    pub fn compact(&self) -> Result<()> {
        for name in COLUMN_FAMILIES {
            let cf = self.cf(name)?;
            self.db.compact_range_cf(cf, None::<&[u8]>, None::<&[u8]>);
        }
        info!("Quad store compacted");
        Ok(())
    }
}

impl QuadStore for RocksStore {
    fn quads_all(&self) -> Result<QuadIter<'_>> {
        self.scan(ScanPlan::for_pattern(&QuadPattern::any()))
    }

    fn quads_matching(&self, pattern: &QuadPattern) -> Result<QuadIter<'_>> {
        let iter = self.scan(ScanPlan::for_pattern(pattern))?;
        let pattern = pattern.clone();
        Ok(Box::new(iter.filter(move |item| {
            item.as_ref().map_or(true, |quad| pattern.matches(quad))
        })))
    }

    fn apply_transaction(&self, delta: &Delta) -> Result<()> {
        let mut batch = WriteBatch::default();

        for quad in &delta.removes {
            for index in Index::ALL {
                batch.delete_cf(self.index_cf(index)?, index.key(quad));
            }
        }

        for quad in &delta.adds {
            quad.validate()?;
            let payload = encode_quad(quad)?;
            for index in Index::ALL {
                batch.put_cf(self.index_cf(index)?, index.key(quad), &payload);
            }
        }

        self.db
            .write_opt(batch, &self.write_options())
            .map_err(store_err)?;

        debug!(
            "Applied {} additions and {} removals",
            delta.adds.len(),
            delta.removes.len()
        );
        Ok(())
    }
}

impl Clone for RocksStore {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
            options: self.options.clone(),
        }
    }
}
