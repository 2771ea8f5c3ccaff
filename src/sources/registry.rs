//! Location registry - building transient locations during the cascade.
//!
//! The registry maps a source kind to a builder that turns a descriptor
//! plus a dependency into a live `Location`. Construction never does I/O;
//! only the path builder is registered out of the box, and embedders wire
//! in their site/git/Chef-server fetchers.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;

use crate::core::Dependency;
use crate::errors::Error;
use crate::sources::descriptor::{LocationDescriptor, SourceKind};
use crate::sources::location::Location;
use crate::sources::path::PathLocation;

/// Builds a location scoped to one dependency from a configured descriptor.
pub type LocationBuilder =
    dyn Fn(&LocationDescriptor, &Dependency) -> Result<Arc<dyn Location>> + Send + Sync;

/// Registry of location builders keyed by source kind.
pub struct LocationRegistry {
    builders: HashMap<SourceKind, Box<LocationBuilder>>,
}

impl LocationRegistry {
    /// Create a registry with the built-in path builder registered.
    pub fn new() -> Self {
        let mut registry = LocationRegistry {
            builders: HashMap::new(),
        };

        registry.register(SourceKind::Path, |descriptor, dep| {
            Ok(Arc::new(PathLocation::from_descriptor(descriptor, dep)))
        });

        registry
    }

    /// Register (or replace) the builder for a source kind.
    pub fn register<F>(&mut self, kind: SourceKind, builder: F)
    where
        F: Fn(&LocationDescriptor, &Dependency) -> Result<Arc<dyn Location>>
            + Send
            + Sync
            + 'static,
    {
        self.builders.insert(kind, Box::new(builder));
    }

    /// Build a transient location for one cascade attempt.
    ///
    /// Builders receive the full descriptor and the dependency they are
    /// scoped to; a builder's configuration is the descriptor's
    /// [`merged_options`](LocationDescriptor::merged_options), its plain
    /// options plus the descriptor's own `kind: value` pair.
    pub fn build(
        &self,
        descriptor: &LocationDescriptor,
        dep: &Dependency,
    ) -> Result<Arc<dyn Location>> {
        let builder = self
            .builders
            .get(&descriptor.kind())
            .ok_or(Error::NoFetcher {
                kind: descriptor.kind(),
            })?;
        builder(descriptor, dep)
    }

    /// Whether a builder is registered for the given kind.
    pub fn supports(&self, kind: SourceKind) -> bool {
        self.builders.contains_key(&kind)
    }
}

impl Default for LocationRegistry {
    fn default() -> Self {
        LocationRegistry::new()
    }
}
