//! Path expressions
//!
//! A path is a start set followed by a chain of steps. Building a path does
//! not touch the store; see [`crate::QueryExecutor`] for evaluation.

use quadgraph_core::{Error, NodeRef, Result, Value};
use regex::Regex;

/// Where a path begins
#[derive(Debug, Clone)]
pub enum Start {
    /// Every node that appears in subject position
    All,
    /// The given nodes, in order
    Nodes(Vec<NodeRef>),
}

/// One stage of a path
#[derive(Debug, Clone)]
pub enum Step {
    /// Keep candidates with a `(candidate, predicate, value)` quad
    Has { predicate: NodeRef, value: Value },
    /// Keep candidates with a `predicate` value matching the regex
    HasRegex { predicate: NodeRef, regex: Regex },
    /// Move to the objects of `(candidate, predicate, *)`
    Out(NodeRef),
    /// Move to the subjects of `(*, predicate, candidate)`
    In(NodeRef),
    /// Keep candidates whose own text matches the regex
    Regex(Regex),
    /// Bind the current candidate to a name
    Tag(String),
    /// Bind the objects of `(candidate, predicate, *)` to a name
    Save {
        predicate: NodeRef,
        name: String,
        optional: bool,
    },
    /// Return to a previously tagged candidate
    Back(String),
    /// Drop repeated candidates
    Unique,
    /// Stop after `n` rows
    Limit(usize),
}

/// A lazily evaluated traversal
#[derive(Debug, Clone)]
pub struct Path {
    start: Start,
    steps: Vec<Step>,
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| Error::InvalidPattern(e.to_string()))
}

impl Path {
    /// Start from every subject node
    pub fn start_all() -> Self {
        Self {
            start: Start::All,
            steps: Vec::new(),
        }
    }

    /// Start from a single node
    pub fn start_from(node: NodeRef) -> Self {
        Self::start_from_nodes(vec![node])
    }

    /// Start from several nodes
    pub fn start_from_nodes(nodes: Vec<NodeRef>) -> Self {
        Self {
            start: Start::Nodes(nodes),
            steps: Vec::new(),
        }
    }

    fn push(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn has<P: Into<NodeRef>, V: Into<Value>>(self, predicate: P, value: V) -> Self {
        self.push(Step::Has {
            predicate: predicate.into(),
            value: value.into(),
        })
    }

    /// Keep candidates having a `predicate` value that matches `pattern`
    ///
    /// Fails with `InvalidPattern` if the regex does not compile.
    pub fn has_regex<P: Into<NodeRef>>(self, predicate: P, pattern: &str) -> Result<Self> {
        let regex = compile(pattern)?;
        Ok(self.push(Step::HasRegex {
            predicate: predicate.into(),
            regex,
        }))
    }

    pub fn out<P: Into<NodeRef>>(self, predicate: P) -> Self {
        self.push(Step::Out(predicate.into()))
    }

    /// Follow `predicate` edges backwards
    pub fn in_<P: Into<NodeRef>>(self, predicate: P) -> Self {
        self.push(Step::In(predicate.into()))
    }

    /// Keep candidates whose string content, or node name, matches `pattern`
    pub fn regex(self, pattern: &str) -> Result<Self> {
        let regex = compile(pattern)?;
        Ok(self.push(Step::Regex(regex)))
    }

    pub fn tag<S: Into<String>>(self, name: S) -> Self {
        self.push(Step::Tag(name.into()))
    }

    /// Bind each `predicate` value to `name`, one row per value
    ///
    /// Candidates without a value are dropped.
    pub fn save<P: Into<NodeRef>, S: Into<String>>(self, predicate: P, name: S) -> Self {
        self.push(Step::Save {
            predicate: predicate.into(),
            name: name.into(),
            optional: false,
        })
    }

    /// Like [`Path::save`], but candidates without a value pass through unbound
    pub fn save_optional<P: Into<NodeRef>, S: Into<String>>(self, predicate: P, name: S) -> Self {
        self.push(Step::Save {
            predicate: predicate.into(),
            name: name.into(),
            optional: true,
        })
    }

    pub fn back<S: Into<String>>(self, name: S) -> Self {
        self.push(Step::Back(name.into()))
    }

    pub fn unique(self) -> Self {
        self.push(Step::Unique)
    }

    pub fn limit(self, n: usize) -> Self {
        self.push(Step::Limit(n))
    }

    pub fn start(&self) -> &Start {
        &self.start
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }
}
