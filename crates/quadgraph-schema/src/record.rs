//! Untyped records
//!
//! A [`Record`] is the field-by-field form of an application value. The
//! mapper only ever sees records; [`crate::Encodable`] and
//! [`crate::Decodable`] convert between records and concrete types.

use crate::entity::Decodable;
use chrono::{DateTime, Utc};
use quadgraph_core::{Error, NodeRef, Result, Value, ValueKind};
use std::collections::BTreeMap;

/// The contents of one field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Value(Value),
    List(Vec<Value>),
    Record(Record),
    Records(Vec<Record>),
}

impl FieldValue {
    /// Shape name used in error messages
    pub fn shape(&self) -> &'static str {
        match self {
            FieldValue::Value(_) => "value",
            FieldValue::List(_) => "list",
            FieldValue::Record(_) => "record",
            FieldValue::Records(_) => "record list",
        }
    }
}

macro_rules! field_value_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for FieldValue {
                fn from(value: $ty) -> Self {
                    FieldValue::Value(value.into())
                }
            }
        )*
    };
}

field_value_from!(Value, NodeRef, String, &str, i64, i32, f64, bool, DateTime<Utc>);

impl From<Record> for FieldValue {
    fn from(record: Record) -> Self {
        FieldValue::Record(record)
    }
}

impl From<Vec<Record>> for FieldValue {
    fn from(records: Vec<Record>) -> Self {
        FieldValue::Records(records)
    }
}

/// Conversion from a stored value into a field type
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self>;
}

fn mismatch<T>(expected: ValueKind, value: &Value) -> Result<T> {
    Err(Error::mismatch(expected.name(), value.kind().name()))
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self> {
        Ok(value.clone())
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self> {
        match value.as_str() {
            Some(s) => Ok(s.to_string()),
            None => mismatch(ValueKind::String, value),
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Result<Self> {
        match value.as_integer() {
            Some(i) => Ok(i),
            None => mismatch(ValueKind::Integer, value),
        }
    }
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> Result<Self> {
        let wide = i64::from_value(value)?;
        i32::try_from(wide).map_err(|_| Error::mismatch("32-bit integer", wide.to_string()))
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self> {
        match value.as_float() {
            Some(f) => Ok(f),
            None => mismatch(ValueKind::Float, value),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self> {
        match value.as_boolean() {
            Some(b) => Ok(b),
            None => mismatch(ValueKind::Boolean, value),
        }
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: &Value) -> Result<Self> {
        match value.as_timestamp() {
            Some(t) => Ok(t),
            None => mismatch(ValueKind::Timestamp, value),
        }
    }
}

impl FromValue for NodeRef {
    fn from_value(value: &Value) -> Result<Self> {
        match value.as_node() {
            Some(node) => Ok(node.clone()),
            None => mismatch(ValueKind::Node, value),
        }
    }
}

/// A record in field form
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    /// Descriptor the record belongs to
    pub type_name: String,

    /// Subject node; assigned on first encode when absent
    pub id: Option<NodeRef>,

    pub fields: BTreeMap<String, FieldValue>,
}

impl Record {
    /// Create an empty record for a descriptor
    pub fn new<S: Into<String>>(type_name: S) -> Self {
        Self {
            type_name: type_name.into(),
            id: None,
            fields: BTreeMap::new(),
        }
    }

    /// Builder: set the subject node
    pub fn with_id(mut self, id: Option<NodeRef>) -> Self {
        self.id = id;
        self
    }

    /// Builder: set a field
    pub fn with<N: Into<String>, V: Into<FieldValue>>(mut self, name: N, value: V) -> Self {
        self.set(name, value);
        self
    }

    /// Builder: set a field only when a value is present
    pub fn with_opt<N: Into<String>, V: Into<FieldValue>>(self, name: N, value: Option<V>) -> Self {
        match value {
            Some(value) => self.with(name, value),
            None => self,
        }
    }

    /// Builder: set a list field
    pub fn with_list<N, V, I>(self, name: N, values: I) -> Self
    where
        N: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.with(name, FieldValue::List(values))
    }

    pub fn set<N: Into<String>, V: Into<FieldValue>>(&mut self, name: N, value: V) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    fn shape_error<T>(&self, name: &str, expected: &str, found: &FieldValue) -> Result<T> {
        Err(Error::mismatch(
            format!("{} for {}.{}", expected, self.type_name, name),
            found.shape(),
        ))
    }

    /// A single value, if stored
    pub fn value<T: FromValue>(&self, name: &str) -> Result<Option<T>> {
        match self.fields.get(name) {
            None => Ok(None),
            Some(FieldValue::Value(v)) => T::from_value(v).map(Some),
            Some(other) => self.shape_error(name, "value", other),
        }
    }

    /// A single value, or the type's default when absent
    pub fn value_or_default<T: FromValue + Default>(&self, name: &str) -> Result<T> {
        Ok(self.value(name)?.unwrap_or_default())
    }

    /// A single value that must be present
    pub fn require<T: FromValue>(&self, name: &str) -> Result<T> {
        self.value(name)?
            .ok_or_else(|| Error::required(&self.type_name, name))
    }

    /// A list of values; absent is empty
    pub fn list<T: FromValue>(&self, name: &str) -> Result<Vec<T>> {
        match self.fields.get(name) {
            None => Ok(Vec::new()),
            Some(FieldValue::List(values)) => values.iter().map(T::from_value).collect(),
            Some(other) => self.shape_error(name, "list", other),
        }
    }

    /// A nested record, if stored
    pub fn record<T: Decodable>(&self, name: &str) -> Result<Option<T>> {
        match self.fields.get(name) {
            None => Ok(None),
            Some(FieldValue::Record(r)) => T::from_record(r).map(Some),
            Some(other) => self.shape_error(name, "record", other),
        }
    }

    /// A list of nested records; absent is empty
    pub fn records<T: Decodable>(&self, name: &str) -> Result<Vec<T>> {
        match self.fields.get(name) {
            None => Ok(Vec::new()),
            Some(FieldValue::Records(records)) => records.iter().map(T::from_record).collect(),
            Some(other) => self.shape_error(name, "record list", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_getters() {
        let record = Record::new("OpeningHours")
            .with("day", NodeRef::iri("http://schema.org/Monday"))
            .with("slot", 2i64)
            .with("opens", "09:00");

        assert_eq!(record.require::<i32>("slot").unwrap(), 2);
        assert_eq!(record.value::<String>("opens").unwrap().as_deref(), Some("09:00"));
        assert_eq!(
            record.require::<NodeRef>("day").unwrap(),
            NodeRef::iri("http://schema.org/Monday")
        );
        assert_eq!(record.value_or_default::<String>("closes").unwrap(), "");
    }

    #[test]
    fn test_require_reports_type_and_field() {
        let record = Record::new("Clinic");
        match record.require::<String>("name") {
            Err(Error::RequiredFieldMissing { entity, field }) => {
                assert_eq!(entity, "Clinic");
                assert_eq!(field, "name");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_kind_mismatch() {
        let record = Record::new("Post").with("msg", 42i64);
        assert!(matches!(
            record.value::<String>("msg"),
            Err(Error::TypeMismatch { .. })
        ));
        assert!(matches!(
            record.list::<String>("msg"),
            Err(Error::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_lists() {
        let record = Record::new("User").with_list("follows", vec![NodeRef::iri("u1"), NodeRef::iri("u2")]);
        let follows: Vec<NodeRef> = record.list("follows").unwrap();
        assert_eq!(follows.len(), 2);
        assert!(record.list::<NodeRef>("blocked").unwrap().is_empty());
    }

    #[test]
    fn test_i32_range_is_checked() {
        let record = Record::new("OpeningHours").with("slot", i64::MAX);
        assert!(record.require::<i32>("slot").is_err());
    }
}
