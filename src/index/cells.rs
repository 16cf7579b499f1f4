//! Cell-token join strategy.
//!
//! The query rectangle's covering is materialized once into an in-memory
//! scratch table; each lookup is then a single three-way join asking "does
//! this blob share any indexed cell with the query".

use crate::bounds::QueryBounds;
use crate::config::FilterConfig;
use crate::covering::{CellCovering, strip_marker};
use crate::error::{FilterError, Result};
use crate::index::Decision;
use rusqlite::{Connection, params};

const SCRATCH_SQL: &str = "\
    PRAGMA temp_store = MEMORY;\
    CREATE TEMP TABLE _query_cells (cell_token TEXT PRIMARY KEY);";

const INSERT_SQL: &str = "INSERT INTO _query_cells VALUES (?1);";

const LOOKUP_SQL: &str = "\
    SELECT EXISTS(\
        SELECT 1 \
        FROM blobs \
        INNER JOIN blob_cells ON (blobs.rowid = blob_cells.blob_rowid) \
        INNER JOIN _query_cells ON (blob_cells.cell_token = _query_cells.cell_token) \
        WHERE blobs.blob_id = ?1);";

#[derive(Debug)]
pub(super) struct CellJoin;

impl CellJoin {
    /// Build the covering for `bounds`, load it into the scratch table, and
    /// prepare the reusable lookup statement. Any failure is fatal to
    /// session init.
    pub(super) fn prepare(
        conn: &Connection,
        bounds: &QueryBounds,
        config: &FilterConfig,
    ) -> Result<Self> {
        let covering = CellCovering::build(bounds, config);
        let terms = covering.query_terms();

        conn.execute_batch(SCRATCH_SQL)
            .map_err(FilterError::QueryPreparation)?;
        {
            let mut insert = conn
                .prepare(INSERT_SQL)
                .map_err(FilterError::QueryPreparation)?;
            for term in &terms {
                insert
                    .execute(params![strip_marker(term)])
                    .map_err(FilterError::QueryPreparation)?;
            }
        }

        // Prepare once here; every lookup pulls the same statement back out
        // of the cache, already reset.
        conn.prepare_cached(LOOKUP_SQL)
            .map_err(FilterError::QueryPreparation)?;

        log::debug!(
            "query covering: {} cells, {} terms",
            covering.cells().len(),
            terms.len()
        );
        Ok(Self)
    }

    pub(super) fn lookup(&self, conn: &Connection, object_id: &[u8]) -> Result<Decision> {
        let mut stmt = conn.prepare_cached(LOOKUP_SQL).map_err(FilterError::Lookup)?;
        let found: bool = stmt
            .query_row(params![object_id], |row| row.get(0))
            .map_err(FilterError::Lookup)?;
        Ok(if found {
            Decision::Match
        } else {
            Decision::NotMatched
        })
    }
}
