//! Clinics and their opening hours

use crate::models::Clinic;
use quadgraph_core::{Error, NodeRef, Result};
use quadgraph_graph::Graph;
use std::path::Path as FsPath;
use tracing::{debug, info};

/// Read a clinic from a JSON file
pub fn load_json<P: AsRef<FsPath>>(path: P) -> Result<Clinic> {
    let raw = std::fs::read_to_string(path.as_ref())?;
    parse_json(&raw).map_err(|e| match e {
        Error::Serialization(msg) => {
            Error::Serialization(format!("{}: {}", path.as_ref().display(), msg))
        }
        other => other,
    })
}

/// Parse a clinic from JSON text
pub fn parse_json(raw: &str) -> Result<Clinic> {
    serde_json::from_str(raw).map_err(|e| Error::Serialization(e.to_string()))
}

/// Register a clinic on behalf of an administrator
pub fn register(graph: &Graph, mut clinic: Clinic, created_by: Option<NodeRef>) -> Result<Clinic> {
    clinic.created_by = created_by;
    let id = graph.insert(&mut clinic)?;
    info!("Registered clinic {} as {}", clinic.name, id);
    Ok(clinic)
}

/// Apply the contents of `changes` to the stored clinic
///
/// Address and telephone are always taken from `changes`. Name and hours
/// are taken only when given, so a partial document keeps them. The
/// previous revision is replaced atomically.
pub fn apply_update(graph: &Graph, id: &NodeRef, changes: &Clinic) -> Result<Clinic> {
    let mut clinic: Clinic = graph.load(id)?;

    if !changes.name.is_empty() {
        clinic.name = changes.name.clone();
    }
    clinic.address = changes.address.clone();
    clinic.office_tel = changes.office_tel.clone();
    if !changes.hours.is_empty() {
        clinic.hours = changes.hours.clone();
    }

    graph.update(&clinic)?;
    debug!("Updated clinic {}", id);
    graph.load(id)
}

/// Delete a clinic together with its opening hours
pub fn delete(graph: &Graph, id: &NodeRef) -> Result<usize> {
    let removed = graph.delete::<Clinic>(id)?;
    info!("Deleted clinic {} ({} quads)", id, removed);
    Ok(removed)
}
