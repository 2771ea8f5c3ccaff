//! Configured source locations.
//!
//! A `LocationDescriptor` identifies one configured source: its kind, a
//! value (URL or path), and free-form options. The ordered `LocationSet`
//! defines cascade priority: earlier descriptors are tried first.

use std::collections::BTreeMap;
use std::fmt;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::Error;

/// API root of the public community cookbook site, used when no location
/// has been configured at all.
pub const DEFAULT_SITE_URL: &str = "https://supermarket.chef.io/api/v1";

/// The kind of cookbook source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Community site HTTP API.
    Site,
    /// Git repository.
    Git,
    /// Local filesystem path.
    Path,
    /// Chef server.
    ChefServer,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SourceKind::Site => "site",
            SourceKind::Git => "git",
            SourceKind::Path => "path",
            SourceKind::ChefServer => "chef_server",
        };
        write!(f, "{}", s)
    }
}

/// One configured source location.
///
/// Identity is `(kind, value)`; options do not participate, so the same
/// site registered twice with different options is still a duplicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationDescriptor {
    kind: SourceKind,
    value: String,
    options: BTreeMap<String, String>,
}

impl LocationDescriptor {
    /// Create a descriptor. URL-shaped kinds have their value validated up
    /// front so a typo'd source fails at configuration time, not mid-cascade.
    pub fn new(
        kind: SourceKind,
        value: impl Into<String>,
        options: BTreeMap<String, String>,
    ) -> Result<Self> {
        let value = value.into();

        match kind {
            SourceKind::Site | SourceKind::Git | SourceKind::ChefServer => {
                Url::parse(&value)
                    .with_context(|| format!("invalid {} location URL: `{}`", kind, value))?;
            }
            SourceKind::Path => {}
        }

        Ok(LocationDescriptor {
            kind,
            value,
            options,
        })
    }

    /// The built-in default: the public community site, no options.
    pub fn default_site() -> Self {
        LocationDescriptor {
            kind: SourceKind::Site,
            value: DEFAULT_SITE_URL.to_string(),
            options: BTreeMap::new(),
        }
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn options(&self) -> &BTreeMap<String, String> {
        &self.options
    }

    /// The descriptor's options merged with its own `kind: value` pair,
    /// which is the configuration handed to a transient location instance.
    pub fn merged_options(&self) -> BTreeMap<String, String> {
        let mut merged = self.options.clone();
        merged.insert(self.kind.to_string(), self.value.clone());
        merged
    }

    fn same_identity(&self, other: &LocationDescriptor) -> bool {
        self.kind == other.kind && self.value == other.value
    }
}

impl fmt::Display for LocationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{}", self.kind, self.value)
    }
}

/// Ordered, duplicate-free list of configured locations.
#[derive(Debug, Clone, Default)]
pub struct LocationSet {
    descriptors: Vec<LocationDescriptor>,
}

impl LocationSet {
    pub fn new() -> Self {
        LocationSet::default()
    }

    /// Append a descriptor, preserving insertion order as cascade priority.
    ///
    /// Fails with [`Error::DuplicateLocation`] when a descriptor with the
    /// same `(kind, value)` identity is already present, even if its
    /// options differ.
    pub fn push(&mut self, descriptor: LocationDescriptor) -> Result<()> {
        if self.descriptors.iter().any(|d| d.same_identity(&descriptor)) {
            return Err(Error::DuplicateLocation {
                kind: descriptor.kind(),
                value: descriptor.value().to_string(),
            }
            .into());
        }
        self.descriptors.push(descriptor);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LocationDescriptor> {
        self.descriptors.iter()
    }
}
