//! QuadGraph Query Engine
//!
//! Provides a small path algebra over a quad store and its lazy evaluator.
//!
//! # Overview
//!
//! A [`Path`] starts from a set of candidate nodes and refines it step by
//! step: filtering by predicate values, following edges forwards or
//! backwards, and saving named bindings along the way. The
//! [`QueryExecutor`] turns a path into a pull-based stream of [`Row`]s,
//! re-reading the store on every run.

pub mod executor;
pub mod path;

pub use executor::{QueryExecutor, QueryResult, QueryStats, Row, RowIter};
pub use path::{Path, Start, Step};
