//! Cookbook sources.
//!
//! Sources are responsible for producing cookbook artifacts from various
//! locations (community site, git repositories, local paths, Chef servers).

pub mod descriptor;
pub mod location;
pub mod path;
pub mod registry;

pub use descriptor::{LocationDescriptor, LocationSet, SourceKind, DEFAULT_SITE_URL};
pub use location::{FetchError, Location};
pub use path::PathLocation;
pub use registry::LocationRegistry;
