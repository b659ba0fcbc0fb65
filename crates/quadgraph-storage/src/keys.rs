//! Key encoding for the quad indices
//!
//! Every quad is stored under three keys, one per index ordering. Each key
//! component is the value wire encoding, length-prefixed so that a key built
//! from the leading components is a strict byte prefix of every key that
//! shares them.

use quadgraph_core::{NodeRef, Quad, QuadPattern, Value};

/// Prefix bytes for different key types
pub mod prefix {
    pub const SPO: u8 = 0x01;
    pub const POS: u8 = 0x02;
    pub const OSP: u8 = 0x03;
    pub const META: u8 = 0x08;
}

/// One of the three quad orderings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Index {
    /// subject, predicate, object
    Spo,
    /// predicate, object, subject
    Pos,
    /// object, subject, predicate
    Osp,
}

impl Index {
    /// All indices a quad is written to
    pub const ALL: [Index; 3] = [Index::Spo, Index::Pos, Index::Osp];

    fn prefix_byte(self) -> u8 {
        match self {
            Index::Spo => prefix::SPO,
            Index::Pos => prefix::POS,
            Index::Osp => prefix::OSP,
        }
    }

    /// Full key for a quad in this ordering
    pub fn key(self, quad: &Quad) -> Vec<u8> {
        let s = node_wire(&quad.subject);
        let p = node_wire(&quad.predicate);
        let o = quad.object.to_wire();
        let (s, p, o) = (s.as_slice(), p.as_slice(), o.as_slice());
        let ordered = match self {
            Index::Spo => [s, p, o],
            Index::Pos => [p, o, s],
            Index::Osp => [o, s, p],
        };

        let mut builder = KeyBuilder::new(1 + s.len() + p.len() + o.len() + 17);
        builder.push_u8(self.prefix_byte());
        for component in ordered {
            builder.push_component(component);
        }
        match &quad.label {
            Some(label) => {
                builder.push_u8(1);
                builder.push_component(&node_wire(label));
            }
            None => builder.push_u8(0),
        }
        builder.finish()
    }

    /// Prefix covering every key whose leading components are `components`
    pub fn prefix(self, components: &[Vec<u8>]) -> Vec<u8> {
        let capacity = 1 + components.iter().map(|c| c.len() + 4).sum::<usize>();
        let mut builder = KeyBuilder::new(capacity);
        builder.push_u8(self.prefix_byte());
        for component in components {
            builder.push_component(component);
        }
        builder.finish()
    }
}

/// A prefix scan that answers a pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanPlan {
    pub index: Index,
    pub prefix: Vec<u8>,
}

impl ScanPlan {
    /// Pick the index whose leading components are bound by the pattern
    pub fn for_pattern(pattern: &QuadPattern) -> Self {
        let s = pattern.subject.as_ref().map(node_wire);
        let p = pattern.predicate.as_ref().map(node_wire);
        let o = pattern.object.as_ref().map(Value::to_wire);

        let (index, components) = match (s, p, o) {
            (Some(s), Some(p), Some(o)) => (Index::Spo, vec![s, p, o]),
            (Some(s), Some(p), None) => (Index::Spo, vec![s, p]),
            (Some(s), None, Some(o)) => (Index::Osp, vec![o, s]),
            (Some(s), None, None) => (Index::Spo, vec![s]),
            (None, Some(p), Some(o)) => (Index::Pos, vec![p, o]),
            (None, Some(p), None) => (Index::Pos, vec![p]),
            (None, None, Some(o)) => (Index::Osp, vec![o]),
            (None, None, None) => (Index::Spo, Vec::new()),
        };

        Self {
            index,
            prefix: index.prefix(&components),
        }
    }
}

/// Key builder for storage operations
#[derive(Debug)]
pub struct KeyBuilder {
    buffer: Vec<u8>,
}

impl KeyBuilder {
    /// Create a new key builder with estimated capacity
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Create a metadata key
    pub fn meta(key: &str) -> Vec<u8> {
        let mut builder = Self::new(1 + key.len());
        builder.push_u8(prefix::META);
        builder.push_bytes(key.as_bytes());
        builder.finish()
    }

    /// Push a single byte
    pub fn push_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    /// Push raw bytes
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Push a length-prefixed component
    pub fn push_component(&mut self, bytes: &[u8]) {
        self.buffer
            .extend_from_slice(&(bytes.len() as u32).to_be_bytes());
        self.buffer.extend_from_slice(bytes);
    }

    /// Finish building and return the key
    pub fn finish(self) -> Vec<u8> {
        self.buffer
    }
}

fn node_wire(node: &NodeRef) -> Vec<u8> {
    Value::Node(node.clone()).to_wire()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad(s: &str, p: &str, o: Value) -> Quad {
        Quad::new(NodeRef::iri(s), p, o)
    }

    #[test]
    fn test_keys_differ_per_index() {
        let q = quad("alice", "follows", Value::Node(NodeRef::iri("bob")));
        let keys: Vec<Vec<u8>> = Index::ALL.iter().map(|i| i.key(&q)).collect();
        assert_eq!(keys[0][0], prefix::SPO);
        assert_eq!(keys[1][0], prefix::POS);
        assert_eq!(keys[2][0], prefix::OSP);
    }

    #[test]
    fn test_label_distinguishes_keys() {
        let q = quad("clinic", "hours", Value::Node(NodeRef::blank("h1")));
        let labelled = q.clone().with_label(NodeRef::blank("slot0"));
        assert_ne!(Index::Spo.key(&q), Index::Spo.key(&labelled));
    }

    #[test]
    fn test_plan_prefix_matches_key() {
        let q = quad("post1", "author", Value::Node(NodeRef::iri("bob")));
        let pattern = QuadPattern::any()
            .predicate(NodeRef::iri("author"))
            .object(NodeRef::iri("bob"));
        let plan = ScanPlan::for_pattern(&pattern);
        assert_eq!(plan.index, Index::Pos);
        assert!(plan.index.key(&q).starts_with(&plan.prefix));
    }

    #[test]
    fn test_prefix_does_not_bleed_into_longer_names() {
        let short = QuadPattern::any().subject(NodeRef::iri("bob"));
        let plan = ScanPlan::for_pattern(&short);
        let other = quad("bobby", "name", Value::from("Bobby"));
        assert!(!Index::Spo.key(&other).starts_with(&plan.prefix));
    }

    #[test]
    fn test_subject_and_object_use_osp() {
        let pattern = QuadPattern::any()
            .subject(NodeRef::iri("alice"))
            .object(NodeRef::iri("bob"));
        assert_eq!(ScanPlan::for_pattern(&pattern).index, Index::Osp);
    }

    #[test]
    fn test_meta_key() {
        let key = KeyBuilder::meta("format_version");
        assert_eq!(key[0], prefix::META);
        assert_eq!(&key[1..], b"format_version");
    }
}
