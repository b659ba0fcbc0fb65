//! Identifier generation for new records
//!
//! Identifiers are 128-bit random UUIDs drawn from the operating system's
//! entropy source, so collisions within one store are negligible.

use crate::error::{Error, Result};
use crate::node::NodeRef;
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use uuid::{Builder, Uuid};

/// Source of fresh subject identifiers
pub trait IdGenerator: Send + Sync {
    /// Produce an identifier not yet used in the store
    fn new_id(&self) -> Result<NodeRef>;
}

/// How generated identifiers are exposed as nodes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdStyle {
    /// `<7f9c...>`, stable across exports
    #[default]
    Iri,
    /// `_:7f9c...`, anonymous
    Blank,
}

/// Random (v4) UUID generator
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator {
    style: IdStyle,
}

impl UuidGenerator {
    /// Create a generator emitting IRIs
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a generator with the given node style
    pub fn with_style(style: IdStyle) -> Self {
        Self { style }
    }

    /// Draw a fresh UUID
    pub fn next_uuid(&self) -> Result<Uuid> {
        let mut bytes = [0u8; 16];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| Error::Generation(e.to_string()))?;
        Ok(Builder::from_random_bytes(bytes).into_uuid())
    }
}

impl IdGenerator for UuidGenerator {
    fn new_id(&self) -> Result<NodeRef> {
        let uuid = self.next_uuid()?.to_string();
        Ok(match self.style {
            IdStyle::Iri => NodeRef::Iri(uuid),
            IdStyle::Blank => NodeRef::Blank(uuid),
        })
    }
}
