//! High-level operations.

pub mod download;

pub use download::Downloader;
