//! QuadGraph Core Library
//!
//! This crate provides the fundamental types, traits, and error handling
//! shared by every QuadGraph layer.
//!
//! # Overview
//!
//! A quad store holds statements of the form
//! `(subject, predicate, object, label)`. Subjects, predicates and labels
//! are [`NodeRef`]s; objects are [`Value`]s, which may themselves be nodes.
//!
//! # Modules
//!
//! - `node` - Node references (IRIs and blank nodes) and well-known predicates
//! - `value` - Typed object values and their wire encoding
//! - `quad` - Quads and quad patterns
//! - `id` - Identifier generation
//! - `error` - Error types and result aliases

pub mod error;
pub mod id;
pub mod node;
pub mod quad;
pub mod value;

pub use error::{Error, Result};
pub use id::{IdGenerator, IdStyle, UuidGenerator};
pub use node::{NodeRef, vocab};
pub use quad::{Quad, QuadPattern};
pub use value::{Value, ValueKind};
