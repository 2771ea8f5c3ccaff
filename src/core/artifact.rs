//! Downloaded cookbook artifacts.

use std::fmt;
use std::path::{Path, PathBuf};

use semver::Version;

/// A cookbook that has been fetched to local disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    name: String,
    version: Version,
    path: PathBuf,
}

impl Artifact {
    pub fn new(name: impl Into<String>, version: Version, path: impl Into<PathBuf>) -> Self {
        Artifact {
            name: name.into(),
            version,
            path: path.into(),
        }
    }

    /// Cookbook name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Exact version that was fetched.
    pub fn version(&self) -> &Version {
        &self.version
    }

    /// Directory the cookbook was unpacked into.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.version)
    }
}
