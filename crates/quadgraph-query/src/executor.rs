//! Path evaluation
//!
//! Each step wraps the row stream of the step before it, so nothing is read
//! from the store until the caller pulls a row. Dropping the stream releases
//! every store cursor it holds.

use crate::path::{Path, Start, Step};
use quadgraph_core::{NodeRef, QuadPattern, Result, Value};
use quadgraph_storage::QuadStore;
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use std::iter;
use std::time::Instant;
use tracing::debug;

/// A candidate and the bindings collected on the way to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    /// The value the path currently points at
    pub current: Value,

    /// Values bound by `tag` and `save`
    pub tags: BTreeMap<String, Value>,
}

impl Row {
    fn new(current: Value) -> Self {
        Self {
            current,
            tags: BTreeMap::new(),
        }
    }

    fn moved_to(&self, current: Value) -> Self {
        Self {
            current,
            tags: self.tags.clone(),
        }
    }

    fn with_tag(mut self, name: &str, value: Value) -> Self {
        self.tags.insert(name.to_string(), value);
        self
    }

    /// The current candidate if it is a node
    pub fn node(&self) -> Option<&NodeRef> {
        self.current.as_node()
    }

    /// Look up a binding
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.tags.get(name)
    }
}

/// Lazy stream of result rows
pub type RowIter<'a> = Box<dyn Iterator<Item = Result<Row>> + 'a>;

/// Query execution result
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    pub rows: Vec<Row>,
    pub stats: QueryStats,
}

/// Execution statistics
#[derive(Debug, Clone, Default)]
pub struct QueryStats {
    pub rows_returned: u64,
    pub execution_time_ms: u64,
}

fn single<'a>(item: Result<Row>) -> RowIter<'a> {
    Box::new(iter::once(item))
}

fn nothing<'a>() -> RowIter<'a> {
    Box::new(iter::empty())
}

/// Replace every row with the rows `f` produces for it
fn expand<'a, F>(rows: RowIter<'a>, mut f: F) -> RowIter<'a>
where
    F: FnMut(Row) -> Result<RowIter<'a>> + 'a,
{
    Box::new(rows.flat_map(move |row| match row.and_then(&mut f) {
        Ok(rows) => rows,
        Err(e) => single(Err(e)),
    }))
}

/// Keep the rows for which `f` holds
fn retain<'a, F>(rows: RowIter<'a>, mut f: F) -> RowIter<'a>
where
    F: FnMut(&Row) -> Result<bool> + 'a,
{
    Box::new(rows.filter_map(move |row| match row {
        Ok(row) => match f(&row) {
            Ok(true) => Some(Ok(row)),
            Ok(false) => None,
            Err(e) => Some(Err(e)),
        },
        Err(e) => Some(Err(e)),
    }))
}

fn text_matches(regex: &Regex, value: &Value) -> bool {
    value.match_text().is_some_and(|text| regex.is_match(text))
}

/// Evaluates paths against a store
pub struct QueryExecutor<'a> {
    store: &'a dyn QuadStore,
}

impl<'a> QueryExecutor<'a> {
    /// Create a new query executor
    pub fn new(store: &'a dyn QuadStore) -> Self {
        Self { store }
    }

    /// Build the lazy row stream for a path
    ///
    /// No match is zero rows, not an error. Store failures surface as `Err`
    /// items in the stream.
    pub fn iterate(&self, path: &Path) -> Result<RowIter<'a>> {
        let mut rows = self.start(path.start())?;
        for step in path.steps() {
            rows = self.apply(rows, step.clone());
        }
        Ok(rows)
    }

    /// Execute a path and collect its rows
    pub fn execute(&self, path: &Path) -> Result<QueryResult> {
        let started = Instant::now();
        let rows = self.iterate(path)?.collect::<Result<Vec<_>>>()?;

        let stats = QueryStats {
            rows_returned: rows.len() as u64,
            execution_time_ms: started.elapsed().as_millis() as u64,
        };
        debug!(
            "Path with {} steps returned {} rows in {}ms",
            path.steps().len(),
            stats.rows_returned,
            stats.execution_time_ms
        );
        Ok(QueryResult { rows, stats })
    }

    pub fn rows(&self, path: &Path) -> Result<Vec<Row>> {
        Ok(self.execute(path)?.rows)
    }

    /// Current values of every row
    pub fn values(&self, path: &Path) -> Result<Vec<Value>> {
        self.iterate(path)?.map(|row| row.map(|r| r.current)).collect()
    }

    /// Current nodes of every row; literal values are skipped
    pub fn nodes(&self, path: &Path) -> Result<Vec<NodeRef>> {
        let mut nodes = Vec::new();
        for row in self.iterate(path)? {
            if let Value::Node(node) = row?.current {
                nodes.push(node);
            }
        }
        Ok(nodes)
    }

    /// The first current value, if any
    pub fn first_value(&self, path: &Path) -> Result<Option<Value>> {
        self.iterate(path)?
            .next()
            .transpose()
            .map(|row| row.map(|r| r.current))
    }

    pub fn count(&self, path: &Path) -> Result<usize> {
        let mut count = 0;
        for row in self.iterate(path)? {
            row?;
            count += 1;
        }
        Ok(count)
    }

    fn start(&self, start: &Start) -> Result<RowIter<'a>> {
        match start {
            Start::All => {
                let mut seen = HashSet::new();
                let quads = self.store.quads_all()?;
                Ok(Box::new(quads.filter_map(move |quad| match quad {
                    Ok(quad) => seen
                        .insert(quad.subject.clone())
                        .then(|| Ok(Row::new(Value::Node(quad.subject)))),
                    Err(e) => Some(Err(e)),
                })))
            }
            Start::Nodes(nodes) => {
                let rows: Vec<Result<Row>> = nodes
                    .iter()
                    .map(|node| Ok(Row::new(Value::Node(node.clone()))))
                    .collect();
                Ok(Box::new(rows.into_iter()))
            }
        }
    }

    fn apply(&self, rows: RowIter<'a>, step: Step) -> RowIter<'a> {
        let store = self.store;
        match step {
            Step::Has { predicate, value } => retain(rows, move |row| {
                let Some(node) = row.node() else {
                    return Ok(false);
                };
                let pattern = QuadPattern::any()
                    .subject(node.clone())
                    .predicate(predicate.clone())
                    .object(value.clone());
                Ok(store.quads_matching(&pattern)?.next().transpose()?.is_some())
            }),

            Step::HasRegex { predicate, regex } => retain(rows, move |row| {
                let Some(node) = row.node() else {
                    return Ok(false);
                };
                let pattern = QuadPattern::any()
                    .subject(node.clone())
                    .predicate(predicate.clone());
                for quad in store.quads_matching(&pattern)? {
                    if text_matches(&regex, &quad?.object) {
                        return Ok(true);
                    }
                }
                Ok(false)
            }),

            Step::Out(predicate) => expand(rows, move |row| {
                let Some(node) = row.node() else {
                    return Ok(nothing());
                };
                let pattern = QuadPattern::any()
                    .subject(node.clone())
                    .predicate(predicate.clone());
                let quads = store.quads_matching(&pattern)?;
                Ok(Box::new(
                    quads.map(move |quad| quad.map(|q| row.moved_to(q.object))),
                ))
            }),

            Step::In(predicate) => expand(rows, move |row| {
                let pattern = QuadPattern::any()
                    .predicate(predicate.clone())
                    .object(row.current.clone());
                let quads = store.quads_matching(&pattern)?;
                Ok(Box::new(quads.map(move |quad| {
                    quad.map(|q| row.moved_to(Value::Node(q.subject)))
                })))
            }),

            Step::Regex(regex) => retain(rows, move |row| Ok(text_matches(&regex, &row.current))),

            Step::Tag(name) => Box::new(rows.map(move |row| {
                row.map(|r| {
                    let current = r.current.clone();
                    r.with_tag(&name, current)
                })
            })),

            Step::Save {
                predicate,
                name,
                optional,
            } => expand(rows, move |row| {
                let Some(node) = row.node() else {
                    return Ok(if optional { single(Ok(row)) } else { nothing() });
                };
                let pattern = QuadPattern::any()
                    .subject(node.clone())
                    .predicate(predicate.clone());
                let mut quads = store.quads_matching(&pattern)?.peekable();
                if quads.peek().is_none() {
                    return Ok(if optional { single(Ok(row)) } else { nothing() });
                }
                let name = name.clone();
                Ok(Box::new(quads.map(move |quad| {
                    quad.map(|q| row.clone().with_tag(&name, q.object))
                })))
            }),

            Step::Back(name) => Box::new(rows.filter_map(move |row| match row {
                Ok(row) => {
                    let target = row.tags.get(&name).cloned()?;
                    Some(Ok(Row {
                        current: target,
                        tags: row.tags,
                    }))
                }
                Err(e) => Some(Err(e)),
            })),

            Step::Unique => {
                let mut seen = HashSet::new();
                retain(rows, move |row| Ok(seen.insert(row.current.clone())))
            }

            Step::Limit(n) => Box::new(rows.take(n)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use quadgraph_core::Quad;
    use quadgraph_storage::{Delta, MemoryStore};

    fn node(name: &str) -> NodeRef {
        NodeRef::iri(name)
    }

    /// bob <- follows - alice; p1, p2 by bob; p3 by alice
    fn news_feed_store() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .apply_transaction(&Delta::adding(vec![
                Quad::new(node("u1"), "name", "bob"),
                Quad::new(node("u2"), "name", "alice"),
                Quad::new(node("u2"), "follows", node("u1")),
                Quad::new(node("p1"), "author", node("u1")),
                Quad::new(node("p1"), "title", "first"),
                Quad::new(node("p2"), "author", node("u1")),
                Quad::new(node("p2"), "title", "second"),
                Quad::new(node("p3"), "author", node("u2")),
                Quad::new(node("p3"), "title", "third"),
            ]))
            .unwrap();
        store
    }

    fn admin_store() -> MemoryStore {
        let store = MemoryStore::new();
        let mut quads = Vec::new();
        for (id, email) in [("a1", "me@fake.com"), ("a2", "me2@fake.com"), ("a3", "dog@fake.com")] {
            quads.push(Quad::new(node(id), "rdf:type", node("Admin")));
            quads.push(Quad::new(node(id), "email", email));
        }
        store.apply_transaction(&Delta::adding(quads)).unwrap();
        store
    }

    fn sorted(mut nodes: Vec<NodeRef>) -> Vec<NodeRef> {
        nodes.sort();
        nodes
    }

    #[test]
    fn test_reverse_traversal() {
        let store = news_feed_store();
        let executor = QueryExecutor::new(&store);

        let path = Path::start_from(node("u2")).out("follows").in_("author");
        assert_eq!(sorted(executor.nodes(&path).unwrap()), vec![node("p1"), node("p2")]);
    }

    #[test]
    fn test_start_all_yields_each_subject_once() {
        let store = news_feed_store();
        let executor = QueryExecutor::new(&store);
        assert_eq!(executor.count(&Path::start_all()).unwrap(), 5);
    }

    #[test]
    fn test_has_filter() {
        let store = news_feed_store();
        let executor = QueryExecutor::new(&store);

        let path = Path::start_all().has("name", "alice");
        assert_eq!(executor.nodes(&path).unwrap(), vec![node("u2")]);

        let path = Path::start_all().has("name", "carol");
        assert!(executor.rows(&path).unwrap().is_empty());
    }

    #[test]
    fn test_regex_filters() {
        let store = admin_store();
        let executor = QueryExecutor::new(&store);

        let path = Path::start_all()
            .has("rdf:type", node("Admin"))
            .has_regex("email", "^me.*")
            .unwrap();
        assert_eq!(sorted(executor.nodes(&path).unwrap()), vec![node("a1"), node("a2")]);

        let path = Path::start_all().out("email").regex("^me.*").unwrap();
        let mut emails: Vec<String> = executor
            .values(&path)
            .unwrap()
            .into_iter()
            .map(|v| v.as_str().unwrap().to_string())
            .collect();
        emails.sort();
        assert_eq!(emails, vec!["me2@fake.com", "me@fake.com"]);
    }

    #[test]
    fn test_tag_save_and_back() {
        let store = news_feed_store();
        let executor = QueryExecutor::new(&store);

        let path = Path::start_from(node("u2"))
            .tag("reader")
            .out("follows")
            .in_("author")
            .save("title", "title")
            .back("reader");
        let rows = executor.rows(&path).unwrap();
        assert_eq!(rows.len(), 2);
        for row in &rows {
            assert_eq!(row.node(), Some(&node("u2")));
            assert!(row.get("title").is_some());
        }
    }

    #[test]
    fn test_save_optional_keeps_rows() {
        let store = news_feed_store();
        let executor = QueryExecutor::new(&store);

        let strict = Path::start_all().save("follows", "follows");
        assert_eq!(executor.count(&strict).unwrap(), 1);

        let lenient = Path::start_all().save_optional("follows", "follows");
        let rows = executor.rows(&lenient).unwrap();
        assert_eq!(rows.len(), 5);
        assert_eq!(rows.iter().filter(|r| r.get("follows").is_some()).count(), 1);
    }

    #[test]
    fn test_unique_and_limit() {
        let store = news_feed_store();
        let executor = QueryExecutor::new(&store);

        let authors = Path::start_all().out("author");
        assert_eq!(executor.count(&authors).unwrap(), 3);
        assert_eq!(executor.count(&authors.clone().unique()).unwrap(), 2);
        assert_eq!(executor.count(&authors.limit(1)).unwrap(), 1);
    }

    #[test]
    fn test_first_value() {
        let store = admin_store();
        let executor = QueryExecutor::new(&store);

        let path = Path::start_all().has("email", "dog@fake.com");
        assert_eq!(executor.first_value(&path).unwrap(), Some(Value::Node(node("a3"))));

        let path = Path::start_all().has("email", "cat@fake.com");
        assert_eq!(executor.first_value(&path).unwrap(), None);
    }

    #[test]
    fn test_paths_reevaluate_against_current_store() {
        let store = news_feed_store();
        let executor = QueryExecutor::new(&store);
        let path = Path::start_from(node("u2")).out("follows").in_("author");
        assert_eq!(executor.count(&path).unwrap(), 2);

        store
            .add_quad(Quad::new(node("p4"), "author", node("u1")))
            .unwrap();
        assert_eq!(executor.count(&path).unwrap(), 3);
    }

    #[test]
    fn test_store_failure_is_not_swallowed() {
        struct Broken;
        impl QuadStore for Broken {
            fn quads_all(&self) -> Result<quadgraph_storage::QuadIter<'_>> {
                Ok(Box::new(iter::once(Err(quadgraph_core::Error::StoreUnavailable(
                    "disk".to_string(),
                )))))
            }
            fn apply_transaction(&self, _delta: &Delta) -> Result<()> {
                Ok(())
            }
        }

        let executor = QueryExecutor::new(&Broken);
        let result = executor.rows(&Path::start_all());
        assert!(matches!(result, Err(quadgraph_core::Error::StoreUnavailable(_))));
    }

    proptest! {
        #[test]
        fn prop_limit_caps_rows(subjects in 0usize..20, n in 0usize..25) {
            let store = MemoryStore::new();
            let quads = (0..subjects)
                .map(|i| Quad::new(node(&format!("s{}", i)), "p", i as i64))
                .collect();
            store.apply_transaction(&Delta::adding(quads)).unwrap();

            let executor = QueryExecutor::new(&store);
            let count = executor.count(&Path::start_all().limit(n)).unwrap();
            prop_assert_eq!(count, subjects.min(n));
        }
    }
}
