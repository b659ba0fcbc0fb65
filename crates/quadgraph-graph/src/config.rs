//! Graph configuration

use quadgraph_core::{Error, IdStyle, Result};
use quadgraph_storage::StorageOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Where quads are kept
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Backend {
    /// Volatile, process-local store
    Memory,
    /// Persistent RocksDB store in a directory
    RocksDb { path: PathBuf },
}

/// Graph configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Storage backend
    pub backend: Backend,

    /// How generated record identifiers are exposed
    pub id_style: IdStyle,

    /// Sync the write-ahead log on every commit
    pub sync_writes: bool,

    /// Log level
    pub log_level: String,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Memory,
            id_style: IdStyle::Iri,
            sync_writes: false,
            log_level: "info".to_string(),
        }
    }
}

impl GraphConfig {
    /// Configuration for an in-memory graph
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Configuration for a persistent graph
    pub fn rocksdb<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            backend: Backend::RocksDb { path: path.into() },
            ..Default::default()
        }
    }

    /// Load configuration from a JSON file
    ///
    /// Missing keys take their default values.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&raw)
            .map_err(|e| Error::Configuration(format!("{}: {}", path.as_ref().display(), e)))
    }

    /// Parse configuration from JSON text
    pub fn from_json_str(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| Error::Configuration(e.to_string()))
    }

    pub fn with_id_style(mut self, style: IdStyle) -> Self {
        self.id_style = style;
        self
    }

    pub fn with_sync_writes(mut self, sync: bool) -> Self {
        self.sync_writes = sync;
        self
    }

    pub fn with_log_level<S: Into<String>>(mut self, level: S) -> Self {
        self.log_level = level.into();
        self
    }

    /// RocksDB options for a persistent backend
    pub fn storage_options(&self) -> Option<StorageOptions> {
        match &self.backend {
            Backend::Memory => None,
            Backend::RocksDb { path } => Some(StorageOptions::new(path.clone()).sync_wal(self.sync_writes)),
        }
    }
}
