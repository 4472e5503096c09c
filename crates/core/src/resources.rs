//! Shared component resources
//!
//! Caches and other shared collaborators travel through this registry
//! rather than module-scoped globals. Components resolve what they need
//! by name at construction time, so a missing resource is a wiring error
//! surfaced before the stream runs.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::{Cache, Error};

/// Named shared resources available to components.
#[derive(Default)]
pub struct Resources {
    caches: RwLock<HashMap<String, Arc<dyn Cache>>>,
}

impl Resources {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a cache under `name`, replacing any previous one.
    pub fn add_cache(&self, name: impl Into<String>, cache: Arc<dyn Cache>) {
        self.caches.write().insert(name.into(), cache);
    }

    /// Resolve a cache by name.
    pub fn cache(&self, name: &str) -> Result<Arc<dyn Cache>, Error> {
        self.caches
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::config(format!("cache resource '{name}' not found")))
    }
}
