//! Stored-envelope overlap strategy.
//!
//! Each indexed blob carries one axis-aligned bounding envelope; a lookup
//! fetches it and runs the exact interval-overlap test against the query
//! bounds. A blob with no row is not indexed at all and must match — data
//! is never dropped just because the indexer skipped it.

use crate::bounds::QueryBounds;
use crate::error::{FilterError, Result};
use crate::index::Decision;
use crate::overlap::Envelope;
use rusqlite::{Connection, OptionalExtension, params};

const LOOKUP_SQL: &str = "SELECT w, s, e, n FROM blobs WHERE blobs.blob_id = ?1;";

#[derive(Debug)]
pub(super) struct EnvelopeOverlap {
    bounds: QueryBounds,
}

impl EnvelopeOverlap {
    pub(super) fn prepare(conn: &Connection, bounds: &QueryBounds) -> Result<Self> {
        // Stored envelopes are compared as plain numeric ranges, which has
        // no meaning for a wrapped longitude interval. Refuse up front
        // rather than abort mid-pass.
        if bounds.crosses_antimeridian() {
            return Err(FilterError::Config(format!(
                "bounds '{bounds}' cross the antimeridian, which the envelope \
                 index cannot evaluate"
            )));
        }

        conn.prepare_cached(LOOKUP_SQL)
            .map_err(FilterError::QueryPreparation)?;
        Ok(Self { bounds: *bounds })
    }

    pub(super) fn lookup(&self, conn: &Connection, object_id: &[u8]) -> Result<Decision> {
        let mut stmt = conn.prepare_cached(LOOKUP_SQL).map_err(FilterError::Lookup)?;
        let envelope = stmt
            .query_row(params![object_id], |row| {
                Ok(Envelope::new(
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                ))
            })
            .optional()
            .map_err(FilterError::Lookup)?;

        match envelope {
            // Not indexed: fail open.
            None => Ok(Decision::Match),
            Some(envelope) => Ok(if envelope.intersects_bounds(&self.bounds) {
                Decision::Match
            } else {
                Decision::NotMatched
            }),
        }
    }
}
