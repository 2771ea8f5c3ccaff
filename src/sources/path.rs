//! Path location - cookbooks taken from a local directory.
//!
//! The one fetcher that ships in-tree. A path location points either
//! directly at a cookbook directory (when a dependency is pinned) or at a
//! directory of cookbooks keyed by name (when built from a `path`
//! descriptor during the cascade).

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::Context;
use regex::Regex;
use semver::Version;

use crate::core::{Artifact, Dependency};
use crate::sources::descriptor::LocationDescriptor;
use crate::sources::location::{FetchError, Location};
use crate::util::fs::copy_dir_all;

/// Matches `version '1.2.3'` (or double-quoted) in a metadata.rb.
static METADATA_VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*version\s+['"]([^'"]+)['"]"#).expect("static regex")
});

/// A cookbook source on the local filesystem.
#[derive(Debug)]
pub struct PathLocation {
    /// Cookbook name this location is scoped to.
    cookbook: String,

    /// Directory expected to contain the cookbook.
    source: PathBuf,

    /// Display name, `path+<dir>`.
    display: String,
}

impl PathLocation {
    /// Point directly at a cookbook directory.
    pub fn new(cookbook: impl Into<String>, source: impl Into<PathBuf>) -> Self {
        let source = source.into();
        let display = format!("path+{}", source.display());
        PathLocation {
            cookbook: cookbook.into(),
            source,
            display,
        }
    }

    /// Build a transient location from a `path` descriptor for a cascade
    /// attempt. The descriptor hands over its options merged with its own
    /// `path: value` pair; the value is a directory of cookbooks, and the
    /// dependency's name selects a subdirectory.
    pub fn from_descriptor(descriptor: &LocationDescriptor, dep: &Dependency) -> Self {
        let config = descriptor.merged_options();
        let base = PathBuf::from(config.get("path").cloned().unwrap_or_default());
        PathLocation::new(dep.name(), base.join(dep.name()))
    }

    /// Read the cookbook version out of its metadata file.
    ///
    /// `metadata.json` wins over `metadata.rb` when both exist. A missing
    /// or unreadable version is a validation failure: the directory was
    /// there, but it is not a well-formed cookbook.
    fn read_version(&self) -> Result<Version, FetchError> {
        let json_path = self.source.join("metadata.json");
        if json_path.is_file() {
            let raw = std::fs::read_to_string(&json_path)
                .with_context(|| format!("failed to read {}", json_path.display()))?;
            let metadata: serde_json::Value =
                serde_json::from_str(&raw).map_err(|e| self.validation(format!(
                    "metadata.json is not valid JSON: {}",
                    e
                )))?;
            let version = metadata
                .get("version")
                .and_then(|v| v.as_str())
                .ok_or_else(|| self.validation("metadata.json has no version field"))?;
            return version
                .parse()
                .map_err(|e| self.validation(format!("bad version `{}`: {}", version, e)));
        }

        let rb_path = self.source.join("metadata.rb");
        if rb_path.is_file() {
            let raw = std::fs::read_to_string(&rb_path)
                .with_context(|| format!("failed to read {}", rb_path.display()))?;
            let captures = METADATA_VERSION_RE
                .captures(&raw)
                .ok_or_else(|| self.validation("metadata.rb declares no version"))?;
            let version = &captures[1];
            return version
                .parse()
                .map_err(|e| self.validation(format!("bad version `{}`: {}", version, e)));
        }

        Err(self.validation("no metadata.json or metadata.rb"))
    }

    fn validation(&self, reason: impl Into<String>) -> FetchError {
        FetchError::Validation {
            name: self.cookbook.clone(),
            reason: reason.into(),
        }
    }
}

impl Location for PathLocation {
    fn name(&self) -> &str {
        &self.display
    }

    fn download(&self, target: &Path) -> Result<Artifact, FetchError> {
        if !self.source.is_dir() {
            return Err(FetchError::NotFound {
                name: self.cookbook.clone(),
                location: self.display.clone(),
            });
        }

        let version = self.read_version()?;

        copy_dir_all(&self.source, target)?;

        Ok(Artifact::new(self.cookbook.clone(), version, target))
    }
}
