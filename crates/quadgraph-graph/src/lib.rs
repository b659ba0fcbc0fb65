//! QuadGraph Graph Handle
//!
//! Provides typed record operations built on top of the storage, query and
//! schema layers.
//!
//! # Overview
//!
//! A [`Graph`] owns a quad store, a schema mapper and a transaction
//! coordinator. Every write it performs is a single transaction, so an
//! update removes the previous revision of a record and adds the new one
//! atomically.

pub mod config;
pub mod graph;

pub use config::{Backend, GraphConfig};
pub use graph::Graph;
