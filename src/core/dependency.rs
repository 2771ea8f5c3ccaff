//! Cookbook dependency specification.
//!
//! A `Dependency` is a named requirement for a cookbook. It may be pinned
//! to an explicit location, in which case the downloader delegates to that
//! location directly instead of cascading through the configured sources.

use std::fmt;
use std::sync::Arc;

use semver::VersionReq;
use serde::{Deserialize, Serialize};

use crate::core::artifact::Artifact;
use crate::sources::location::Location;

/// Source options persisted per cookbook in the lockfile.
///
/// The shape of a `sources` entry in the structured lock format. Unknown
/// keys are rejected so a typo'd lockfile fails loudly instead of silently
/// dropping information.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceOptions {
    /// Exact version recorded at resolution time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked_version: Option<String>,

    /// Local path the cookbook was taken from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Git repository URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git: Option<String>,

    /// Git reference (branch, tag, or revision).
    #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
    pub git_ref: Option<String>,

    /// Community site API root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site: Option<String>,
}

impl SourceOptions {
    /// Drop empty-string values. Entries loaded from old lockfiles sometimes
    /// carry `""` where absent was meant; both normalize to `None` so a
    /// round trip compares equal.
    fn normalized(mut self) -> Self {
        fn scrub(slot: &mut Option<String>) {
            if slot.as_deref().is_some_and(|v| v.trim().is_empty()) {
                *slot = None;
            }
        }
        scrub(&mut self.locked_version);
        scrub(&mut self.path);
        scrub(&mut self.git);
        scrub(&mut self.git_ref);
        scrub(&mut self.site);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == SourceOptions::default()
    }
}

/// A named cookbook requirement.
#[derive(Clone)]
pub struct Dependency {
    /// Cookbook name. Case-significant; the unique key everywhere.
    name: String,

    /// Version requirement. Lockfile-loaded dependencies carry `*`.
    version_req: VersionReq,

    /// Explicit pinned location, if any.
    location: Option<Arc<dyn Location>>,

    /// Persisted source options.
    options: SourceOptions,

    /// Filled in after a successful download.
    cached_artifact: Option<Artifact>,
}

impl Dependency {
    /// Create a dependency.
    ///
    /// This is the single constructor path: fresh declarations and entries
    /// loaded from the lockfile (structured or legacy) all come through
    /// here, so option normalization applies uniformly.
    pub fn new(name: impl Into<String>, version_req: VersionReq, options: SourceOptions) -> Self {
        Dependency {
            name: name.into(),
            version_req,
            location: None,
            options: options.normalized(),
            cached_artifact: None,
        }
    }

    /// Pin this dependency to an explicit location.
    pub fn with_location(mut self, location: Arc<dyn Location>) -> Self {
        self.location = Some(location);
        self
    }

    /// Cookbook name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Version requirement.
    pub fn version_req(&self) -> &VersionReq {
        &self.version_req
    }

    /// The pinned location, if this dependency has one.
    pub fn location(&self) -> Option<&Arc<dyn Location>> {
        self.location.as_ref()
    }

    /// Persisted source options.
    pub fn options(&self) -> &SourceOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut SourceOptions {
        &mut self.options
    }

    /// The artifact produced by the last successful download, if any.
    pub fn cached_artifact(&self) -> Option<&Artifact> {
        self.cached_artifact.as_ref()
    }

    pub fn set_cached_artifact(&mut self, artifact: Artifact) {
        self.cached_artifact = Some(artifact);
    }

    /// Options as they should be persisted: the stored options with
    /// `locked_version` refreshed from the cached artifact when present.
    pub fn lock_options(&self) -> SourceOptions {
        let mut options = self.options.clone();
        if let Some(artifact) = &self.cached_artifact {
            options.locked_version = Some(artifact.version().to_string());
        }
        options
    }
}

impl fmt::Debug for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dependency")
            .field("name", &self.name)
            .field("version_req", &self.version_req.to_string())
            .field("location", &self.location.as_ref().map(|l| l.name()))
            .field("options", &self.options)
            .field("cached_artifact", &self.cached_artifact)
            .finish()
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if self.version_req != VersionReq::STAR {
            write!(f, " {}", self.version_req)?;
        }
        Ok(())
    }
}

/// Anything that can key the lockfile's dependency table.
///
/// Lookups and removals accept either a raw name or a dependency; both
/// resolve to the cookbook name.
pub trait CookbookKey {
    fn cookbook_name(&self) -> &str;
}

impl CookbookKey for str {
    fn cookbook_name(&self) -> &str {
        self
    }
}

impl CookbookKey for &str {
    fn cookbook_name(&self) -> &str {
        self
    }
}

impl CookbookKey for String {
    fn cookbook_name(&self) -> &str {
        self
    }
}

impl CookbookKey for Dependency {
    fn cookbook_name(&self) -> &str {
        self.name()
    }
}

impl CookbookKey for &Dependency {
    fn cookbook_name(&self) -> &str {
        self.name()
    }
}
