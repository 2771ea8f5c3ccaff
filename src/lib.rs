//! Galley - cookbook dependency fetching and lockfile management.
//!
//! Galley resolves declared cookbook dependencies to downloadable
//! artifacts by cascading through a prioritized set of source locations,
//! and persists the resolved set to a lockfile so repeated installs
//! reproduce identical versions.
//!
//! The two load-bearing pieces are [`ops::Downloader`] (the cascading
//! location search) and [`lockfile::Lockfile`] (the persisted dependency
//! table, including transparent migration of the deprecated free-text
//! format). Concrete fetchers live behind the [`sources::Location`] trait;
//! only the local-path fetcher ships in-tree.

pub mod core;
pub mod errors;
pub mod lockfile;
pub mod ops;
pub mod sources;
pub mod util;

pub use core::{Artifact, CookbookKey, Dependency, SourceOptions};
pub use errors::Error;
pub use lockfile::Lockfile;
pub use ops::Downloader;
pub use sources::{
    FetchError, Location, LocationDescriptor, LocationRegistry, LocationSet, SourceKind,
    DEFAULT_SITE_URL,
};
pub use util::{LogReporter, Reporter};
