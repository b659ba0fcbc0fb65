//! Object values
//!
//! Provides the typed values that may appear in the object position of a
//! quad, together with their binary wire encoding.

use crate::error::{Error, Result};
use crate::node::NodeRef;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Wire tags. Node tags sort before literal tags.
mod tag {
    pub const IRI: u8 = 0x01;
    pub const BLANK: u8 = 0x02;
    pub const STRING: u8 = 0x10;
    pub const INTEGER: u8 = 0x11;
    pub const FLOAT: u8 = 0x12;
    pub const BOOLEAN: u8 = 0x13;
    pub const TIMESTAMP: u8 = 0x14;
}

const SIGN_BIT: u64 = 1 << 63;

/// A value in the object position of a quad
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    /// A reference to another node
    Node(NodeRef),

    /// UTF-8 string
    String(String),

    /// 64-bit signed integer
    Integer(i64),

    /// 64-bit floating point
    Float(f64),

    /// Boolean value
    Boolean(bool),

    /// Instant in UTC
    Timestamp(DateTime<Utc>),
}

/// The declared kind of a scalar field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Node,
    String,
    Integer,
    Float,
    Boolean,
    Timestamp,
}

impl ValueKind {
    /// Get the type name of this kind
    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Node => "node",
            ValueKind::String => "string",
            ValueKind::Integer => "integer",
            ValueKind::Float => "float",
            ValueKind::Boolean => "boolean",
            ValueKind::Timestamp => "timestamp",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Value {
    /// Get the kind of this value
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Node(_) => ValueKind::Node,
            Value::String(_) => ValueKind::String,
            Value::Integer(_) => ValueKind::Integer,
            Value::Float(_) => ValueKind::Float,
            Value::Boolean(_) => ValueKind::Boolean,
            Value::Timestamp(_) => ValueKind::Timestamp,
        }
    }

    /// Returns true for the empty value of each kind
    ///
    /// Timestamps are never considered empty, and `-0.0` is not the empty float.
    pub fn is_zero(&self) -> bool {
        match self {
            Value::Node(node) => node.is_empty(),
            Value::String(s) => s.is_empty(),
            Value::Integer(i) => *i == 0,
            Value::Float(f) => f.to_bits() == 0,
            Value::Boolean(b) => !*b,
            Value::Timestamp(_) => false,
        }
    }

    /// Try to get as node reference
    pub fn as_node(&self) -> Option<&NodeRef> {
        match self {
            Value::Node(node) => Some(node),
            _ => None,
        }
    }

    /// Try to get as string reference
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as integer
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to get as float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Try to get as boolean
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get as timestamp
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    /// The text a regular expression is matched against
    ///
    /// Strings match on their content and nodes on their bare name.
    pub fn match_text(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            Value::Node(node) => Some(node.name()),
            _ => None,
        }
    }

    /// Encode to the store wire representation
    ///
    /// The encoding is deterministic and, within one kind, order-preserving.
    pub fn to_wire(&self) -> Vec<u8> {
        match self {
            Value::Node(NodeRef::Iri(name)) => tagged(tag::IRI, name.as_bytes()),
            Value::Node(NodeRef::Blank(name)) => tagged(tag::BLANK, name.as_bytes()),
            Value::String(s) => tagged(tag::STRING, s.as_bytes()),
            Value::Integer(i) => tagged(tag::INTEGER, &((*i as u64) ^ SIGN_BIT).to_be_bytes()),
            Value::Float(f) => tagged(tag::FLOAT, &f.to_bits().to_be_bytes()),
            Value::Boolean(b) => tagged(tag::BOOLEAN, &[*b as u8]),
            Value::Timestamp(ts) => {
                let mut buf = Vec::with_capacity(13);
                buf.push(tag::TIMESTAMP);
                buf.extend_from_slice(&((ts.timestamp() as u64) ^ SIGN_BIT).to_be_bytes());
                buf.extend_from_slice(&ts.timestamp_subsec_nanos().to_be_bytes());
                buf
            }
        }
    }

    /// Decode from the store wire representation
    pub fn from_wire(bytes: &[u8]) -> Result<Self> {
        let (&tag_byte, payload) = bytes
            .split_first()
            .ok_or_else(|| Error::Serialization("empty value encoding".to_string()))?;

        match tag_byte {
            tag::IRI => Ok(Value::Node(NodeRef::Iri(utf8(payload)?))),
            tag::BLANK => Ok(Value::Node(NodeRef::Blank(utf8(payload)?))),
            tag::STRING => Ok(Value::String(utf8(payload)?)),
            tag::INTEGER => Ok(Value::Integer((u64::from_be_bytes(fixed(payload)?) ^ SIGN_BIT) as i64)),
            tag::FLOAT => Ok(Value::Float(f64::from_bits(u64::from_be_bytes(fixed(payload)?)))),
            tag::BOOLEAN => match payload {
                [0] => Ok(Value::Boolean(false)),
                [1] => Ok(Value::Boolean(true)),
                _ => Err(Error::Serialization("invalid boolean encoding".to_string())),
            },
            tag::TIMESTAMP => {
                if payload.len() != 12 {
                    return Err(Error::Serialization("invalid timestamp encoding".to_string()));
                }
                let secs = (u64::from_be_bytes(fixed(&payload[..8])?) ^ SIGN_BIT) as i64;
                let nanos = u32::from_be_bytes(fixed(&payload[8..])?);
                DateTime::from_timestamp(secs, nanos)
                    .map(Value::Timestamp)
                    .ok_or_else(|| Error::Serialization("timestamp out of range".to_string()))
            }
            other => Err(Error::Serialization(format!("unknown value tag {:#04x}", other))),
        }
    }
}

fn tagged(tag: u8, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(payload.len() + 1);
    buf.push(tag);
    buf.extend_from_slice(payload);
    buf
}

fn utf8(payload: &[u8]) -> Result<String> {
    String::from_utf8(payload.to_vec()).map_err(|e| Error::Serialization(e.to_string()))
}

fn fixed<const N: usize>(payload: &[u8]) -> Result<[u8; N]> {
    payload
        .try_into()
        .map_err(|_| Error::Serialization(format!("expected {} bytes, found {}", N, payload.len())))
}

// Floats compare by bit pattern so that Value can be used as a set key.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Node(a), Value::Node(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Timestamp(a), Value::Timestamp(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Node(node) => node.hash(state),
            Value::String(s) => s.hash(state),
            Value::Integer(i) => i.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::Boolean(b) => b.hash(state),
            Value::Timestamp(ts) => ts.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Node(node) => write!(f, "{}", node),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Integer(i) => write!(f, "\"{}\"^^<xsd:integer>", i),
            Value::Float(v) => write!(f, "\"{}\"^^<xsd:double>", v),
            Value::Boolean(b) => write!(f, "\"{}\"^^<xsd:boolean>", b),
            Value::Timestamp(ts) => write!(f, "\"{}\"^^<xsd:dateTime>", ts.to_rfc3339()),
        }
    }
}

// Convenience From implementations
impl From<NodeRef> for Value {
    fn from(v: NodeRef) -> Self {
        Value::Node(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_value_kinds() {
        assert_eq!(Value::from("x").kind(), ValueKind::String);
        assert_eq!(Value::from(3i64).kind(), ValueKind::Integer);
        assert_eq!(Value::from(NodeRef::iri("a")).kind(), ValueKind::Node);
        assert_eq!(ValueKind::Timestamp.to_string(), "timestamp");
    }

    #[test]
    fn test_zero_values() {
        assert!(Value::from("").is_zero());
        assert!(Value::from(0i64).is_zero());
        assert!(Value::from(false).is_zero());
        assert!(Value::Node(NodeRef::iri("")).is_zero());
        assert!(!Value::from("admin").is_zero());
        assert!(!Value::Timestamp(DateTime::from_timestamp(0, 0).unwrap()).is_zero());
        assert!(Value::Float(0.0).is_zero());
        assert!(!Value::Float(-0.0).is_zero());
    }

    #[test]
    fn test_integer_encoding_preserves_order() {
        let lo = Value::Integer(-5).to_wire();
        let mid = Value::Integer(0).to_wire();
        let hi = Value::Integer(7).to_wire();
        assert!(lo < mid && mid < hi);
    }

    #[test]
    fn test_node_and_string_encode_differently() {
        assert_ne!(
            Value::Node(NodeRef::iri("bob")).to_wire(),
            Value::String("bob".to_string()).to_wire()
        );
    }

    #[test]
    fn test_malformed_wire_rejected() {
        assert!(Value::from_wire(&[]).is_err());
        assert!(Value::from_wire(&[0x11, 1, 2]).is_err());
        assert!(Value::from_wire(&[0x13, 9]).is_err());
        assert!(Value::from_wire(&[0x7f]).is_err());
    }

    #[test]
    fn test_float_identity_by_bits() {
        assert_eq!(Value::Float(f64::NAN), Value::Float(f64::NAN));
        assert_ne!(Value::Float(0.0), Value::Float(-0.0));
    }

    fn arb_value() -> impl Strategy<Value = Value> {
        prop_oneof![
            ".*".prop_map(|s| Value::Node(NodeRef::Iri(s))),
            ".*".prop_map(|s| Value::Node(NodeRef::Blank(s))),
            ".*".prop_map(Value::String),
            any::<i64>().prop_map(Value::Integer),
            any::<f64>().prop_map(Value::Float),
            any::<bool>().prop_map(Value::Boolean),
            (-62_135_596_800i64..253_402_300_799i64, 0u32..1_000_000_000u32).prop_map(|(secs, nanos)| {
                Value::Timestamp(DateTime::from_timestamp(secs, nanos).unwrap())
            }),
        ]
    }

    proptest! {
        #[test]
        fn wire_encoding_is_lossless(value in arb_value()) {
            let decoded = Value::from_wire(&value.to_wire()).unwrap();
            prop_assert_eq!(decoded, value);
        }
    }
}
