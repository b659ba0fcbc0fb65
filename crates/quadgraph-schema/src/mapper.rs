//! Record to quad mapping
//!
//! Encoding walks a record depth first: nested records are written before the
//! edge that points at them, and every element of a repeated field carries
//! its position in the quad label. Decoding reads all quads of a subject in
//! one scan and resolves reverse links through the path engine.

use crate::descriptor::{Cardinality, Direction, EntityDescriptor, FieldBinding, FieldKind};
use crate::record::{FieldValue, Record};
use crate::registry::TypeRegistry;
use quadgraph_core::{
    Error, IdGenerator, NodeRef, Quad, QuadPattern, Result, UuidGenerator, Value, vocab,
};
use quadgraph_query::{Path, QueryExecutor};
use quadgraph_storage::QuadStore;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Deepest chain of nested records that is encoded or decoded
pub const MAX_NESTING_DEPTH: usize = 16;

fn check_depth(depth: usize, descriptor: &EntityDescriptor) -> Result<()> {
    if depth > MAX_NESTING_DEPTH {
        return Err(Error::Validation(format!(
            "{} is nested more than {} levels deep",
            descriptor.name, MAX_NESTING_DEPTH
        )));
    }
    Ok(())
}

/// Check a stored or supplied value against the field's declared kind
fn check_kind(field: &FieldBinding, value: &Value) -> Result<()> {
    let ok = match &field.kind {
        FieldKind::Scalar(kind) => value.kind() == *kind,
        FieldKind::Node | FieldKind::Nested(_) => value.as_node().is_some(),
    };
    if ok {
        return Ok(());
    }
    let expected = match &field.kind {
        FieldKind::Scalar(kind) => kind.name().to_string(),
        FieldKind::Node => "node".to_string(),
        FieldKind::Nested(name) => format!("{} node", name),
    };
    Err(Error::mismatch(
        format!("{} for {}", expected, field.name),
        value.kind().name(),
    ))
}

fn shape_mismatch(field: &FieldBinding, found: &FieldValue) -> Error {
    let expected = match field.cardinality {
        Cardinality::Repeated => "list",
        Cardinality::Single | Cardinality::Optional => "value",
    };
    Error::mismatch(format!("{} for {}", expected, field.name), found.shape())
}

/// Converts records to quads and back
pub struct SchemaMapper {
    registry: TypeRegistry,
    ids: Arc<dyn IdGenerator>,
}

impl SchemaMapper {
    /// Create a mapper over a registry
    pub fn new(registry: TypeRegistry, ids: Arc<dyn IdGenerator>) -> Self {
        Self { registry, ids }
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Add or replace a descriptor
    pub fn register(&mut self, descriptor: EntityDescriptor) -> Result<()> {
        self.registry.register(descriptor)
    }

    /// Get a registered descriptor
    pub fn descriptor(&self, name: &str) -> Result<Arc<EntityDescriptor>> {
        self.registry.get(name)
    }

    fn nested_descriptor(&self, field: &FieldBinding) -> Result<Arc<EntityDescriptor>> {
        match &field.kind {
            FieldKind::Nested(name) => self.registry.get(name),
            _ => Err(Error::mismatch(
                format!("nested record field for {}", field.name),
                "literal field",
            )),
        }
    }

    // ========== Encoding ==========

    /// Decompose a record into quads
    ///
    /// Assigns identifiers to the record and to any nested record that has
    /// none, writing them back into `record`. Empty single values and
    /// excluded fields produce no quads, while list elements are always
    /// written. Required fields are not checked here.
    pub fn encode(
        &self,
        record: &mut Record,
        descriptor: &EntityDescriptor,
    ) -> Result<(Vec<Quad>, NodeRef)> {
        let mut quads = Vec::new();
        let id = self.encode_into(record, descriptor, 0, &mut quads)?;
        debug!("Encoded {} {} as {} quads", descriptor.name, id, quads.len());
        Ok((quads, id))
    }

    fn encode_into(
        &self,
        record: &mut Record,
        descriptor: &EntityDescriptor,
        depth: usize,
        quads: &mut Vec<Quad>,
    ) -> Result<NodeRef> {
        check_depth(depth, descriptor)?;
        let Some(type_tag) = &descriptor.type_tag else {
            return Err(Error::Validation(format!(
                "{} is a projection and cannot be written",
                descriptor.name
            )));
        };

        let id = match &record.id {
            Some(id) if !id.is_empty() => id.clone(),
            _ => self.ids.new_id()?,
        };
        record.id = Some(id.clone());
        if record.type_name.is_empty() {
            record.type_name = descriptor.name.clone();
        }

        quads.push(Quad::new(id.clone(), vocab::rdf_type(), type_tag.clone()));

        for field in descriptor.fields.iter().filter(|f| f.is_written()) {
            let Some(value) = record.fields.get_mut(&field.name) else {
                continue;
            };

            match (field.cardinality, value) {
                (Cardinality::Repeated, FieldValue::List(values)) => {
                    for value in values.iter() {
                        check_kind(field, value)?;
                    }
                    for (slot, value) in values.iter().enumerate() {
                        quads.push(
                            Quad::new(id.clone(), field.predicate.clone(), value.clone())
                                .with_label(vocab::slot(slot)),
                        );
                    }
                }
                (Cardinality::Repeated, FieldValue::Records(records)) => {
                    let nested = self.nested_descriptor(field)?;
                    for (slot, child) in records.iter_mut().enumerate() {
                        let child_id = self.encode_into(child, &nested, depth + 1, quads)?;
                        quads.push(
                            Quad::new(id.clone(), field.predicate.clone(), child_id)
                                .with_label(vocab::slot(slot)),
                        );
                    }
                }
                (Cardinality::Single | Cardinality::Optional, FieldValue::Value(value)) => {
                    check_kind(field, value)?;
                    if !value.is_zero() {
                        quads.push(Quad::new(id.clone(), field.predicate.clone(), value.clone()));
                    }
                }
                (Cardinality::Single | Cardinality::Optional, FieldValue::Record(child)) => {
                    let nested = self.nested_descriptor(field)?;
                    let child_id = self.encode_into(child, &nested, depth + 1, quads)?;
                    quads.push(Quad::new(id.clone(), field.predicate.clone(), child_id));
                }
                (_, other) => return Err(shape_mismatch(field, other)),
            }
        }

        Ok(id)
    }

    // ========== Decoding ==========

    /// Rebuild the record stored at `node`
    ///
    /// Fails with `NodeNotFound` when a typed descriptor's tag is not on the
    /// node, nested records included.
    pub fn decode(
        &self,
        store: &dyn QuadStore,
        node: &NodeRef,
        descriptor: &EntityDescriptor,
    ) -> Result<Record> {
        self.decode_at(store, node, descriptor, 0)
    }

    fn decode_at(
        &self,
        store: &dyn QuadStore,
        node: &NodeRef,
        descriptor: &EntityDescriptor,
        depth: usize,
    ) -> Result<Record> {
        check_depth(depth, descriptor)?;

        let mut by_predicate: HashMap<NodeRef, Vec<Quad>> = HashMap::new();
        for quad in store.quads_matching(&QuadPattern::any().subject(node.clone()))? {
            let quad = quad?;
            by_predicate
                .entry(quad.predicate.clone())
                .or_default()
                .push(quad);
        }

        // Typed records exist only where their tag was written
        if let Some(tag) = &descriptor.type_tag {
            let tagged = by_predicate
                .get(&vocab::rdf_type())
                .is_some_and(|types| types.iter().any(|q| q.object.as_node() == Some(tag)));
            if !tagged {
                return Err(Error::NodeNotFound(format!("{} {}", descriptor.name, node)));
            }
        }

        let mut record = Record::new(descriptor.name.clone()).with_id(Some(node.clone()));

        for field in descriptor.readable_fields() {
            let values: Vec<Value> = match field.direction {
                Direction::Forward => {
                    let mut quads = by_predicate.get(&field.predicate).cloned().unwrap_or_default();
                    if field.cardinality == Cardinality::Repeated {
                        // Unlabelled quads keep store order after the slotted ones
                        quads.sort_by_key(|q| {
                            q.label
                                .as_ref()
                                .and_then(vocab::slot_ordinal)
                                .unwrap_or(usize::MAX)
                        });
                    }
                    quads.into_iter().map(|q| q.object).collect()
                }
                Direction::Reverse => self.incoming(store, node, field)?,
            };

            if values.is_empty() {
                if field.required {
                    return Err(Error::required(&descriptor.name, &field.name));
                }
                continue;
            }

            for value in &values {
                check_kind(field, value)?;
            }

            let decoded = match (&field.kind, field.cardinality) {
                (FieldKind::Nested(_), Cardinality::Repeated) => {
                    let nested = self.nested_descriptor(field)?;
                    let children = values
                        .iter()
                        .map(|v| self.decode_child(store, v, &nested, depth + 1))
                        .collect::<Result<Vec<_>>>()?;
                    FieldValue::Records(children)
                }
                (FieldKind::Nested(_), _) => {
                    let nested = self.nested_descriptor(field)?;
                    FieldValue::Record(self.decode_child(store, &values[0], &nested, depth + 1)?)
                }
                (_, Cardinality::Repeated) => FieldValue::List(values),
                (_, _) => FieldValue::Value(values[0].clone()),
            };
            record.fields.insert(field.name.clone(), decoded);
        }

        Ok(record)
    }

    fn decode_child(
        &self,
        store: &dyn QuadStore,
        value: &Value,
        descriptor: &EntityDescriptor,
        depth: usize,
    ) -> Result<Record> {
        let node = value
            .as_node()
            .ok_or_else(|| Error::mismatch("node", value.kind().name()))?;
        self.decode_at(store, node, descriptor, depth)
    }

    /// Subjects of `(*, predicate, node)`, restricted to the nested type if it has a tag
    fn incoming(&self, store: &dyn QuadStore, node: &NodeRef, field: &FieldBinding) -> Result<Vec<Value>> {
        let mut path = Path::start_from(node.clone()).in_(field.predicate.clone());
        if let FieldKind::Nested(_) = field.kind {
            if let Some(tag) = &self.nested_descriptor(field)?.type_tag {
                path = path.has(vocab::rdf_type(), tag.clone());
            }
        }
        QueryExecutor::new(store).values(&path.unique())
    }

    // ========== Bulk reads ==========

    /// Path yielding every candidate node for a descriptor
    ///
    /// Typed descriptors match on their type tag; projections consider
    /// every subject.
    pub fn candidates(&self, descriptor: &EntityDescriptor) -> Path {
        match &descriptor.type_tag {
            Some(tag) => Path::start_all().has(vocab::rdf_type(), tag.clone()),
            None => Path::start_all(),
        }
    }

    /// Decode every record of a descriptor
    ///
    /// For projections a missing required field filters the candidate out
    /// instead of failing the whole read.
    pub fn decode_all(&self, store: &dyn QuadStore, descriptor: &EntityDescriptor) -> Result<Vec<Record>> {
        let nodes = QueryExecutor::new(store).nodes(&self.candidates(descriptor))?;

        let mut records = Vec::with_capacity(nodes.len());
        for node in &nodes {
            match self.decode(store, node, descriptor) {
                Ok(record) => records.push(record),
                Err(Error::RequiredFieldMissing { .. }) if descriptor.is_projection() => {}
                Err(e) => return Err(e),
            }
        }
        debug!(
            "Loaded {} of {} candidate {} records",
            records.len(),
            nodes.len(),
            descriptor.name
        );
        Ok(records)
    }

    /// Decode the node at every row of a path
    ///
    /// Rows that end on literals are skipped.
    pub fn decode_path(
        &self,
        store: &dyn QuadStore,
        path: &Path,
        descriptor: &EntityDescriptor,
    ) -> Result<Vec<Record>> {
        QueryExecutor::new(store)
            .nodes(path)?
            .iter()
            .map(|node| self.decode(store, node, descriptor))
            .collect()
    }

    // ========== Snapshots ==========

    /// Every stored quad belonging to the record at `node`
    ///
    /// That is its subject quads plus, recursively, those of records held in
    /// forward nested fields. Node references and reverse links point at
    /// records with their own lifetime and are not followed.
    pub fn owned_quads(
        &self,
        store: &dyn QuadStore,
        node: &NodeRef,
        descriptor: &EntityDescriptor,
    ) -> Result<Vec<Quad>> {
        let mut visited = HashSet::new();
        let mut owned = Vec::new();
        self.collect_owned(store, node, descriptor, 0, &mut visited, &mut owned)?;
        Ok(owned)
    }

    fn collect_owned(
        &self,
        store: &dyn QuadStore,
        node: &NodeRef,
        descriptor: &EntityDescriptor,
        depth: usize,
        visited: &mut HashSet<NodeRef>,
        owned: &mut Vec<Quad>,
    ) -> Result<()> {
        check_depth(depth, descriptor)?;
        if !visited.insert(node.clone()) {
            return Ok(());
        }

        let quads = store
            .quads_matching(&QuadPattern::any().subject(node.clone()))?
            .collect::<Result<Vec<_>>>()?;

        for field in descriptor.fields.iter().filter(|f| f.is_written()) {
            if !matches!(field.kind, FieldKind::Nested(_)) {
                continue;
            }
            let nested = self.nested_descriptor(field)?;
            for quad in quads.iter().filter(|q| q.predicate == field.predicate) {
                if let Some(child) = quad.object.as_node() {
                    self.collect_owned(store, child, &nested, depth + 1, visited, owned)?;
                }
            }
        }

        owned.extend(quads);
        Ok(())
    }
}

impl Default for SchemaMapper {
    fn default() -> Self {
        Self::new(TypeRegistry::new(), Arc::new(UuidGenerator::new()))
    }
}
