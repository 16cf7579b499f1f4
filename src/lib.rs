//! Spatial object-visitation filter for content-addressed feature
//! repositories.
//!
//! A repository walker calls the filter once per visited object; for blobs
//! holding per-feature spatial payloads, the filter consults a persisted
//! read-only spatial index and tells the walker whether to include or omit
//! the blob. Commits, tags, trees and non-feature blobs are always
//! included, and when no index is available the filter fails open and omits
//! nothing.
//!
//! ```rust
//! use geosieve::{FilterSession, ObjectKind, ObjectRef, Situation};
//! use std::path::Path;
//!
//! # fn main() -> geosieve::Result<()> {
//! let mut session = FilterSession::init(Path::new(".repo"), "10,45,12,47")?;
//!
//! let object = ObjectRef { kind: ObjectKind::Blob, id: &[0u8; 20] };
//! let visit = session.visit(Situation::Blob, object, "roads/.sno-dataset/feature/ab/cd")?;
//! assert!(!visit.omit); // no index on disk: fail open
//!
//! let stats = session.finish();
//! assert_eq!(stats.visited, 1);
//! # Ok(())
//! # }
//! ```

pub mod bounds;
pub mod config;
pub mod covering;
pub mod error;
pub mod ffi;
pub mod filter;
pub mod index;
pub mod overlap;

pub use bounds::QueryBounds;
pub use config::FilterConfig;
pub use covering::CellCovering;
pub use error::{FilterError, Result};
pub use filter::{Directive, FilterSession, ObjectKind, ObjectRef, SessionStats, Situation, Visit};
pub use index::{Decision, SpatialIndex};
pub use overlap::{Envelope, ranges_overlap};

/// Crate version, as published.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
