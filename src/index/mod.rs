//! Spatial index adapter: read-only SQLite lookups behind two strategies.
//!
//! The index file is built entirely outside this crate and consumed here
//! through a narrow query contract. Two on-disk schemas exist as independent
//! evolutions of the same design:
//!
//! - **cell-token schema**: `blobs(blob_id)` plus `blob_cells(blob_rowid,
//!   cell_token)` — membership is decided by joining the blob's indexed
//!   cells against the session's precomputed query-cell set;
//! - **envelope schema**: `blobs(blob_id, w, s, e, n)` — membership is
//!   decided by exact interval overlap against the stored extent.
//!
//! Which strategy a session uses is decided once at init by sniffing the
//! schema of whichever candidate file opens. A missing or unreadable index
//! is never an error: the session degrades to fail-open mode and omits
//! nothing for its entire lifetime.

mod cells;
mod envelope;

use crate::bounds::QueryBounds;
use crate::config::FilterConfig;
use crate::error::{FilterError, Result};
use rusqlite::{Connection, OpenFlags, params};
use std::path::Path;

use cells::CellJoin;
use envelope::EnvelopeOverlap;

/// Outcome of a per-object membership lookup. Engine failures surface as
/// [`FilterError::Lookup`] instead, never as a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The object lies within (or cannot be ruled out of) the query bounds.
    Match,
    /// The object's indexed extent is disjoint from the query bounds.
    NotMatched,
}

#[derive(Debug)]
enum Strategy {
    Cells(CellJoin),
    Envelope(EnvelopeOverlap),
}

/// An open spatial index with its prepared per-session lookup.
///
/// Owned by exactly one session and used from a single thread; the prepared
/// lookup statement lives in the connection's statement cache, where it is
/// reset and rebound for every blob rather than re-prepared. Dropping the
/// index finalizes the statement and closes the connection on every exit
/// path, fatal aborts included.
#[derive(Debug)]
pub struct SpatialIndex {
    conn: Connection,
    strategy: Strategy,
}

impl SpatialIndex {
    /// Probe the candidate index files under `meta_dir` and prepare the
    /// session lookup against the first one that opens.
    ///
    /// Returns `Ok(None)` when no usable index exists — missing files and
    /// unreadable/corrupt files both land here, downgrading the session to
    /// fail-open. A file that opens cleanly but has an unrecognized schema,
    /// or a failure preparing the lookup statement, is fatal.
    pub fn open(
        meta_dir: &Path,
        bounds: &QueryBounds,
        config: &FilterConfig,
    ) -> Result<Option<Self>> {
        for filename in &config.index_filenames {
            let path = meta_dir.join(filename);
            if !path.exists() {
                continue;
            }

            let conn = match Connection::open_with_flags(
                &path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            ) {
                Ok(conn) => conn,
                Err(err) => {
                    log::warn!(
                        "spatial index {} could not be opened ({err}); \
                         no objects will be omitted",
                        path.display()
                    );
                    return Ok(None);
                }
            };

            let strategy = match sniff_schema(&conn) {
                Ok(Some(Schema::Cells)) => {
                    Strategy::Cells(CellJoin::prepare(&conn, bounds, config)?)
                }
                Ok(Some(Schema::Envelope)) => {
                    Strategy::Envelope(EnvelopeOverlap::prepare(&conn, bounds)?)
                }
                Ok(None) => return Err(FilterError::UnrecognizedSchema(path)),
                Err(err) => {
                    // Opens lazily; a corrupt file first fails here.
                    log::warn!(
                        "spatial index {} is unreadable ({err}); \
                         no objects will be omitted",
                        path.display()
                    );
                    return Ok(None);
                }
            };

            log::debug!(
                "spatial index {}: {} lookup prepared",
                path.display(),
                match strategy {
                    Strategy::Cells(_) => "cell-join",
                    Strategy::Envelope(_) => "envelope-overlap",
                }
            );
            return Ok(Some(Self { conn, strategy }));
        }

        log::warn!(
            "no spatial index found in {}; no objects will be omitted",
            meta_dir.display()
        );
        Ok(None)
    }

    /// Decide membership for one object identity (the raw content-hash
    /// bytes, as stored in the index).
    pub fn lookup(&self, object_id: &[u8]) -> Result<Decision> {
        match &self.strategy {
            Strategy::Cells(cells) => cells.lookup(&self.conn, object_id),
            Strategy::Envelope(envelope) => envelope.lookup(&self.conn, object_id),
        }
    }
}

enum Schema {
    Cells,
    Envelope,
}

fn sniff_schema(conn: &Connection) -> rusqlite::Result<Option<Schema>> {
    if table_exists(conn, "blob_cells")? {
        return Ok(Some(Schema::Cells));
    }
    if table_exists(conn, "blobs")? && column_exists(conn, "blobs", "w")? {
        return Ok(Some(Schema::Envelope));
    }
    Ok(None)
}

fn table_exists(conn: &Connection, name: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1);",
        params![name],
        |row| row.get(0),
    )
}

fn column_exists(conn: &Connection, table: &str, column: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM pragma_table_info(?1) WHERE name = ?2);",
        params![table, column],
        |row| row.get(0),
    )
}
