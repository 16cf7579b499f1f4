//! Error types for filter sessions.

use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, FilterError>;

/// Errors raised by a filter session.
///
/// Every variant is fatal: configuration and preparation problems abort
/// session init, and lookup/protocol failures abort the traversal that is
/// underway. A missing or unreadable index file is deliberately *not* an
/// error — the session downgrades to fail-open mode at init and never omits
/// anything (see [`SpatialIndex::open`](crate::index::SpatialIndex::open)).
#[derive(Debug, Error)]
pub enum FilterError {
    /// The filter argument string is malformed or geodetically invalid.
    #[error("invalid filter bounds: {0}")]
    Config(String),

    /// The index file opened, but preparing the session's lookup query
    /// against it failed.
    #[error("preparing spatial index lookup: {0}")]
    QueryPreparation(#[source] rusqlite::Error),

    /// The index file opened, but exposes neither the cell-token schema nor
    /// the envelope schema. A preparation failure, fatal at init.
    #[error("spatial index {0} has no recognized schema")]
    UnrecognizedSchema(PathBuf),

    /// A per-object lookup failed at bind or step time. Aborts the whole
    /// pass: a silently skipped filter decision would corrupt the derived
    /// result set.
    #[error("spatial index lookup failed: {0}")]
    Lookup(#[source] rusqlite::Error),

    /// The walker delivered a situation/object-kind combination outside the
    /// expected set.
    #[error("unexpected walker callback: {0}")]
    Protocol(String),
}
