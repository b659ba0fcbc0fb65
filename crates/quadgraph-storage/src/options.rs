//! RocksDB quad store options

use std::path::PathBuf;

/// Block compression for the index column families
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Lz4,
    Zstd,
}

impl Compression {
    pub(crate) fn to_rocksdb(self) -> rocksdb::DBCompressionType {
        match self {
            Compression::None => rocksdb::DBCompressionType::None,
            Compression::Lz4 => rocksdb::DBCompressionType::Lz4,
            Compression::Zstd => rocksdb::DBCompressionType::Zstd,
        }
    }
}

/// How far a committed transaction is persisted before `commit` returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Durability {
    /// Write-ahead log disabled; a crash loses unflushed commits
    Unlogged,

    /// Logged but not synced; survives a process crash
    Logged,

    /// Logged and synced; survives power loss
    Synced,
}

/// Options for opening a [`crate::RocksStore`]
#[derive(Debug, Clone)]
pub struct StorageOptions {
    /// Database directory
    pub path: PathBuf,

    pub create_if_missing: bool,

    /// Memtable size in bytes
    pub write_buffer_size: usize,

    pub max_write_buffers: i32,

    /// Flush and compaction threads
    pub background_jobs: i32,

    pub compression: Compression,

    /// Bloom filter bits per key on each index; `None` disables the filter
    pub bloom_bits_per_key: Option<f64>,

    pub durability: Durability,
}

impl StorageOptions {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Small buffers, no compression and no syncing
    pub fn for_testing<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            write_buffer_size: 4 << 20,
            max_write_buffers: 2,
            background_jobs: 2,
            compression: Compression::None,
            ..Default::default()
        }
    }

    /// Large buffers, compressed blocks and synced commits
    pub fn for_production<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            write_buffer_size: 64 << 20,
            max_write_buffers: 4,
            compression: Compression::Zstd,
            durability: Durability::Synced,
            ..Default::default()
        }
    }

    pub fn write_buffer_size(mut self, bytes: usize) -> Self {
        self.write_buffer_size = bytes;
        self
    }

    pub fn compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    pub fn bloom_filter(mut self, bits_per_key: Option<f64>) -> Self {
        self.bloom_bits_per_key = bits_per_key;
        self
    }

    pub fn durability(mut self, durability: Durability) -> Self {
        self.durability = durability;
        self
    }

    /// Sync every commit, or only log it
    pub fn sync_wal(self, sync: bool) -> Self {
        self.durability(if sync { Durability::Synced } else { Durability::Logged })
    }
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./quadgraph-data"),
            create_if_missing: true,
            write_buffer_size: 32 << 20,
            max_write_buffers: 3,
            background_jobs: 4,
            compression: Compression::Lz4,
            bloom_bits_per_key: Some(10.0),
            durability: Durability::Logged,
        }
    }
}
