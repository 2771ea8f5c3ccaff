//! Domain error types.
//!
//! These are the error kinds a caller can meaningfully branch on. They are
//! raised through `anyhow::Result` at the public API; use
//! `err.downcast_ref::<Error>()` to recover the typed kind.

use thiserror::Error;

use crate::sources::descriptor::SourceKind;

/// Error raised by the downloader and lockfile store.
#[derive(Debug, Error)]
pub enum Error {
    /// A location with the same `(kind, value)` identity is already
    /// configured. Options are not part of the identity.
    #[error("location `{kind}+{value}` is already configured")]
    DuplicateLocation { kind: SourceKind, value: String },

    /// No configured location could produce the cookbook, or a lockfile
    /// operation targeted a cookbook that is not in the table. The message
    /// stays neutral because both origins raise it.
    #[error("cookbook `{name}` not found")]
    CookbookNotFound { name: String },

    /// A legacy lockfile line did not match the legacy grammar.
    #[error("could not parse legacy lockfile line {line}: {message}")]
    LegacyParse { line: usize, message: String },

    /// A cascade descriptor named a source kind with no registered fetcher.
    #[error("no fetcher registered for `{kind}` locations")]
    NoFetcher { kind: SourceKind },
}
