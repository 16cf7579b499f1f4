//! Object-visitation state machine and filter session.
//!
//! The walker drives the session with one [`FilterSession::visit`] call per
//! object, in whatever traversal order it chooses. Each call is independent
//! given the session state; the only memory between calls is the running
//! counters. Spatial filtering applies to blobs on feature paths only —
//! commits, tags, trees and non-feature blobs are always included, so a
//! filtered clone stays structurally complete.

use crate::bounds::QueryBounds;
use crate::config::FilterConfig;
use crate::error::{FilterError, Result};
use crate::index::{Decision, SpatialIndex};
use std::path::Path;
use std::time::{Duration, Instant};

/// Traversal phase reported by the walker for a visited object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Situation {
    /// A commit object.
    Commit,
    /// An annotated tag object.
    Tag,
    /// Entering a tree object.
    BeginTree,
    /// Leaving a tree object.
    EndTree,
    /// A blob object.
    Blob,
}

/// Kind tag of a content-addressed object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    /// Commit object.
    Commit,
    /// Directory-listing object.
    Tree,
    /// File-content leaf object.
    Blob,
    /// Annotated tag object.
    Tag,
}

/// Borrowed view of a visited object: its kind and content-hash identity.
///
/// The walker owns both; the filter only reads them for the duration of one
/// `visit` call.
#[derive(Debug, Clone, Copy)]
pub struct ObjectRef<'a> {
    /// Object kind, as resolved by the walker.
    pub kind: ObjectKind,
    /// Raw content-hash bytes (fixed width per repository hash algorithm).
    pub id: &'a [u8],
}

bitflags::bitflags! {
    /// Traversal-control bits returned to the walker.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Directive: u8 {
        /// Record the object as visited so the walker never revisits it.
        const MARK_SEEN = 0b01;
        /// Emit the object into the traversal result.
        const SHOW = 0b10;
    }
}

/// Per-object outcome: directive bits plus the omission flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Visit {
    /// Traversal-control bits for the walker.
    pub directive: Directive,
    /// Set only when the object must be excluded from the result set.
    pub omit: bool,
}

impl Visit {
    fn shown() -> Self {
        Self {
            directive: Directive::MARK_SEEN | Directive::SHOW,
            omit: false,
        }
    }

    fn omitted() -> Self {
        Self {
            directive: Directive::MARK_SEEN,
            omit: true,
        }
    }

    fn none() -> Self {
        Self {
            directive: Directive::empty(),
            omit: false,
        }
    }
}

/// Final counters for one filtering pass.
#[derive(Debug, Clone, Copy)]
pub struct SessionStats {
    /// Objects delivered by the walker, of any kind.
    pub visited: u64,
    /// Feature blobs that matched the query bounds.
    pub matched: u64,
    /// Wall time from the first visit to session end.
    pub elapsed: Duration,
}

/// One filtering pass over a repository walk.
///
/// Created by [`init`](Self::init), exclusively owned by the walker, driven
/// by [`visit`](Self::visit) once per object, and closed by
/// [`finish`](Self::finish). Single-threaded by contract: a session must
/// never be shared across concurrent traversals.
#[derive(Debug)]
pub struct FilterSession {
    bounds: QueryBounds,
    config: FilterConfig,
    index: Option<SpatialIndex>,
    visited: u64,
    matched: u64,
    started_at: Option<Instant>,
}

impl FilterSession {
    /// Start a session with default configuration. `meta_dir` is the
    /// repository's private metadata directory, where index files live;
    /// `filter_arg` is the `west,south,east,north` bounds string.
    ///
    /// Fails only on configuration or preparation errors. A missing index
    /// is not a failure — the session comes up in fail-open mode.
    pub fn init(meta_dir: &Path, filter_arg: &str) -> Result<Self> {
        Self::init_with_config(meta_dir, filter_arg, FilterConfig::default())
    }

    /// Start a session with explicit configuration.
    pub fn init_with_config(
        meta_dir: &Path,
        filter_arg: &str,
        config: FilterConfig,
    ) -> Result<Self> {
        let bounds: QueryBounds = filter_arg.parse()?;
        let index = SpatialIndex::open(meta_dir, &bounds, &config)?;
        Ok(Self {
            bounds,
            config,
            index,
            visited: 0,
            matched: 0,
            started_at: None,
        })
    }

    /// The session's query rectangle.
    pub fn bounds(&self) -> &QueryBounds {
        &self.bounds
    }

    /// Whether a spatial index was found and prepared. When `false`, the
    /// session is fail-open and never omits anything.
    pub fn index_available(&self) -> bool {
        self.index.is_some()
    }

    /// Objects visited so far.
    pub fn visited(&self) -> u64 {
        self.visited
    }

    /// Decide traversal directives for one visited object.
    ///
    /// Returns an error on index-lookup failure or on a situation/kind
    /// combination outside the expected set; either is fatal and the walker
    /// must abort the pass rather than continue with a partial result.
    pub fn visit(
        &mut self,
        situation: Situation,
        object: ObjectRef<'_>,
        path: &str,
    ) -> Result<Visit> {
        if self.started_at.is_none() {
            self.started_at = Some(Instant::now());
        }
        self.visited += 1;
        if self.config.progress_interval > 0 && self.visited % self.config.progress_interval == 0 {
            log::debug!("visited {} objects", self.visited);
        }

        match situation {
            Situation::Commit => {
                self.expect_kind(situation, object.kind, ObjectKind::Commit)?;
                Ok(Visit::shown())
            }
            Situation::Tag => {
                self.expect_kind(situation, object.kind, ObjectKind::Tag)?;
                Ok(Visit::shown())
            }
            Situation::BeginTree => {
                self.expect_kind(situation, object.kind, ObjectKind::Tree)?;
                // Always traverse into trees; filtering happens at blobs.
                Ok(Visit::shown())
            }
            Situation::EndTree => {
                self.expect_kind(situation, object.kind, ObjectKind::Tree)?;
                Ok(Visit::none())
            }
            Situation::Blob => {
                self.expect_kind(situation, object.kind, ObjectKind::Blob)?;
                self.visit_blob(object.id, path)
            }
        }
    }

    fn visit_blob(&mut self, object_id: &[u8], path: &str) -> Result<Visit> {
        // Only feature payloads are spatially filtered.
        if !self.is_feature_path(path) {
            return Ok(Visit::shown());
        }
        // No usable index for this repository: don't omit anything.
        let Some(index) = &self.index else {
            return Ok(Visit::shown());
        };
        match index.lookup(object_id)? {
            Decision::Match => {
                self.matched += 1;
                Ok(Visit::shown())
            }
            Decision::NotMatched => Ok(Visit::omitted()),
        }
    }

    fn is_feature_path(&self, path: &str) -> bool {
        self.config
            .feature_path_markers
            .iter()
            .any(|marker| path.contains(marker.as_str()))
    }

    fn expect_kind(
        &self,
        situation: Situation,
        got: ObjectKind,
        want: ObjectKind,
    ) -> Result<()> {
        if got == want {
            Ok(())
        } else {
            Err(FilterError::Protocol(format!(
                "{situation:?} callback delivered a {got:?} object"
            )))
        }
    }

    /// End the session: release the index handle and prepared statement,
    /// log the final counters, and return them.
    pub fn finish(self) -> SessionStats {
        let elapsed = self.started_at.map_or(Duration::ZERO, |t| t.elapsed());
        let stats = SessionStats {
            visited: self.visited,
            matched: self.matched,
            elapsed,
        };
        let secs = elapsed.as_secs_f64();
        let rate = if secs > 0.0 {
            stats.visited as f64 / secs
        } else {
            0.0
        };
        log::info!(
            "spatial filter pass: visited={} matched={} elapsed={:.3}s rate={:.0}/s",
            stats.visited,
            stats.matched,
            secs,
            rate
        );
        stats
    }
}
