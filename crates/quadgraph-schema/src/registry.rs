//! Registry of entity descriptors

use crate::descriptor::EntityDescriptor;
use quadgraph_core::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Descriptors by name
///
/// Registering a name again replaces the earlier descriptor; nothing is
/// merged.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    descriptors: HashMap<String, Arc<EntityDescriptor>>,
}

impl TypeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a descriptor
    pub fn register(&mut self, descriptor: EntityDescriptor) -> Result<()> {
        descriptor.validate()?;

        let name = descriptor.name.clone();
        match self.descriptors.insert(name.clone(), Arc::new(descriptor)) {
            Some(previous) if *previous != *self.descriptors[&name] => {
                debug!("Replaced descriptor {}", name);
            }
            Some(_) => {}
            None => debug!("Registered descriptor {}", name),
        }
        Ok(())
    }

    /// Get a descriptor by name
    pub fn get(&self, name: &str) -> Result<Arc<EntityDescriptor>> {
        self.descriptors
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownType(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.descriptors.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.descriptors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
