//! Error types for QuadGraph
//!
//! Provides a single error hierarchy shared by the storage, query and
//! schema layers.

use thiserror::Error;

/// The main error type for QuadGraph operations
#[derive(Error, Debug)]
pub enum Error {
    // ========== Input Errors ==========
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    // ========== Schema Errors ==========
    #[error("Required field missing: {entity}.{field}")]
    RequiredFieldMissing { entity: String, field: String },

    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("Unknown type: {0}")]
    UnknownType(String),

    // ========== Identifier Errors ==========
    #[error("Identifier generation failed: {0}")]
    Generation(String),

    // ========== Transaction Errors ==========
    #[error("A transaction is already open on this handle")]
    TransactionAlreadyOpen,

    #[error("Transaction aborted: {0}")]
    TransactionAborted(String),

    // ========== Storage Errors ==========
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    // ========== Serialization Errors ==========
    #[error("Serialization error: {0}")]
    Serialization(String),

    // ========== IO Errors ==========
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ========== Configuration Errors ==========
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Result type alias for QuadGraph operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Shorthand for a missing required field
    pub fn required(entity: impl Into<String>, field: impl Into<String>) -> Self {
        Error::RequiredFieldMissing {
            entity: entity.into(),
            field: field.into(),
        }
    }

    /// Shorthand for a value of the wrong kind
    pub fn mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Error::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Returns true if the underlying store failed
    pub fn is_store_failure(&self) -> bool {
        matches!(self, Error::StoreUnavailable(_) | Error::Io(_))
    }

    /// Returns true if stored data did not fit a record descriptor
    pub fn is_schema_violation(&self) -> bool {
        matches!(
            self,
            Error::RequiredFieldMissing { .. } | Error::TypeMismatch { .. } | Error::UnknownType(_)
        )
    }

    /// Returns true if retrying the same call may succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::TransactionAlreadyOpen | Error::NodeNotFound(_) | Error::Generation(_)
        )
    }
}
