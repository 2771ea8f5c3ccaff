//! Location trait - common interface for all cookbook sources.
//!
//! Concrete fetchers (community site, git, Chef server, local path) live
//! behind this trait. The downloader only cares about the three ways a
//! fetch can fail, because they drive its fallback rules.

use std::fmt;
use std::path::Path;

use thiserror::Error;

use crate::core::Artifact;

/// How a fetch can fail.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The location does not have the cookbook. The only recoverable kind:
    /// it means absence, not malfunction, so the cascade may try the next
    /// configured location.
    #[error("cookbook `{name}` not found at {location}")]
    NotFound { name: String, location: String },

    /// The cookbook was there but failed integrity or structure checks.
    /// Never retried elsewhere and never swallowed.
    #[error("cookbook `{name}` failed validation: {reason}")]
    Validation { name: String, reason: String },

    /// Anything else: network fault, auth failure, disk error. Could recur
    /// identically at every remaining location, so the cascade stops.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FetchError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::NotFound { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, FetchError::Validation { .. })
    }
}

/// A source capable of producing a cookbook artifact.
pub trait Location: fmt::Debug + Send + Sync {
    /// Human-readable name for display and logging.
    fn name(&self) -> &str;

    /// Fetch the cookbook into `target` and describe what was fetched.
    fn download(&self, target: &Path) -> Result<Artifact, FetchError>;
}
