//! Shared utilities

pub mod fs;
pub mod hash;
pub mod report;

pub use report::{LogReporter, Reporter};
