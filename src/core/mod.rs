//! Core data structures for Galley.
//!
//! - Cookbook dependencies and their persisted source options
//! - Downloaded artifacts

pub mod artifact;
pub mod dependency;

pub use artifact::Artifact;
pub use dependency::{CookbookKey, Dependency, SourceOptions};
