//! End-to-end filter sessions against real on-disk index fixtures.

use geosieve::{Directive, FilterSession, ObjectKind, ObjectRef, Situation};
use geo::Coord;
use rusqlite::{Connection, params};
use std::path::Path;
use tempfile::TempDir;

const FEATURE_PATH: &str = "roads/.sno-dataset/feature/ab/cd/ef";

const OID_X: &[u8] = &[0x11; 20];
const OID_Y: &[u8] = &[0x22; 20];
const OID_Z: &[u8] = &[0x33; 20];

/// Create an envelope-schema index holding the given (blob_id, w, s, e, n)
/// rows, the way the external indexer lays it out.
fn envelope_fixture(dir: &Path, rows: &[(&[u8], f64, f64, f64, f64)]) {
    let conn = Connection::open(dir.join("feature_envelopes.db")).expect("create index");
    conn.execute_batch(
        "CREATE TABLE blobs (
             blob_id BLOB NOT NULL PRIMARY KEY,
             w REAL NOT NULL,
             s REAL NOT NULL,
             e REAL NOT NULL,
             n REAL NOT NULL
         );",
    )
    .expect("create schema");
    for &(blob_id, w, s, e, n) in rows {
        conn.execute(
            "INSERT INTO blobs (blob_id, w, s, e, n) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![blob_id, w, s, e, n],
        )
        .expect("insert envelope");
    }
}

/// Create a cell-token-schema index. Each blob is indexed at the cell
/// containing its point, plus every ancestor prefix of that cell.
fn cells_fixture(dir: &Path, rows: &[(&[u8], f64, f64)]) {
    let conn = Connection::open(dir.join("feature_cells.db")).expect("create index");
    conn.execute_batch(
        "CREATE TABLE blobs (blob_id BLOB NOT NULL PRIMARY KEY);
         CREATE TABLE blob_cells (
             blob_rowid INTEGER NOT NULL,
             cell_token TEXT NOT NULL,
             PRIMARY KEY (blob_rowid, cell_token)
         );",
    )
    .expect("create schema");
    for &(blob_id, x, y) in rows {
        conn.execute("INSERT INTO blobs (blob_id) VALUES (?1);", params![blob_id])
            .expect("insert blob");
        let rowid = conn.last_insert_rowid();
        let cell = geohash::encode(Coord { x, y }, 8).expect("encode point");
        for end in 1..=cell.len() {
            conn.execute(
                "INSERT INTO blob_cells (blob_rowid, cell_token) VALUES (?1, ?2);",
                params![rowid, &cell[..end]],
            )
            .expect("insert cell token");
        }
    }
}

fn blob(id: &[u8]) -> ObjectRef<'_> {
    ObjectRef {
        kind: ObjectKind::Blob,
        id,
    }
}

fn shown(directive: Directive) -> bool {
    directive == Directive::MARK_SEEN | Directive::SHOW
}

#[test]
fn envelope_blob_inside_bounds_is_shown() {
    let dir = TempDir::new().expect("tempdir");
    envelope_fixture(dir.path(), &[(OID_X, 11.0, 46.0, 13.0, 48.0)]);

    let mut session = FilterSession::init(dir.path(), "10,45,12,47").expect("init");
    assert!(session.index_available());

    let visit = session
        .visit(Situation::Blob, blob(OID_X), FEATURE_PATH)
        .expect("visit");
    assert!(shown(visit.directive));
    assert!(!visit.omit);

    let stats = session.finish();
    assert_eq!(stats.visited, 1);
    assert_eq!(stats.matched, 1);
}

#[test]
fn envelope_blob_outside_bounds_is_omitted() {
    let dir = TempDir::new().expect("tempdir");
    envelope_fixture(dir.path(), &[(OID_Y, 20.0, 20.0, 21.0, 21.0)]);

    let mut session = FilterSession::init(dir.path(), "10,45,12,47").expect("init");
    let visit = session
        .visit(Situation::Blob, blob(OID_Y), FEATURE_PATH)
        .expect("visit");
    assert_eq!(visit.directive, Directive::MARK_SEEN);
    assert!(visit.omit);

    let stats = session.finish();
    assert_eq!(stats.matched, 0);
}

#[test]
fn envelope_unindexed_blob_is_shown() {
    let dir = TempDir::new().expect("tempdir");
    envelope_fixture(dir.path(), &[(OID_Y, 20.0, 20.0, 21.0, 21.0)]);

    let mut session = FilterSession::init(dir.path(), "10,45,12,47").expect("init");
    // OID_Z has no row: not indexed, must never be dropped.
    let visit = session
        .visit(Situation::Blob, blob(OID_Z), FEATURE_PATH)
        .expect("visit");
    assert!(shown(visit.directive));
    assert!(!visit.omit);
}

#[test]
fn envelope_full_walk_keeps_structure_and_drops_far_features() {
    let dir = TempDir::new().expect("tempdir");
    envelope_fixture(
        dir.path(),
        &[
            (OID_X, 11.0, 46.0, 13.0, 48.0),
            (OID_Y, 20.0, 20.0, 21.0, 21.0),
        ],
    );

    let mut session = FilterSession::init(dir.path(), "10,45,12,47").expect("init");
    let tree = ObjectRef {
        kind: ObjectKind::Tree,
        id: OID_Z,
    };
    let commit = ObjectRef {
        kind: ObjectKind::Commit,
        id: OID_Z,
    };

    assert!(shown(
        session.visit(Situation::Commit, commit, "").expect("commit").directive
    ));
    assert!(shown(
        session
            .visit(Situation::BeginTree, tree, "roads")
            .expect("begin tree")
            .directive
    ));
    assert!(!session.visit(Situation::Blob, blob(OID_X), FEATURE_PATH).expect("near").omit);
    assert!(session.visit(Situation::Blob, blob(OID_Y), FEATURE_PATH).expect("far").omit);
    assert_eq!(
        session
            .visit(Situation::EndTree, tree, "roads")
            .expect("end tree")
            .directive,
        Directive::empty()
    );

    let stats = session.finish();
    assert_eq!(stats.visited, 5);
    assert_eq!(stats.matched, 1);
}

#[test]
fn cells_blob_inside_bounds_is_shown() {
    let dir = TempDir::new().expect("tempdir");
    // One blob at (11, 46), inside the query; one far away in another
    // hemisphere, sharing no cell ancestors with the query covering.
    cells_fixture(dir.path(), &[(OID_X, 11.0, 46.0), (OID_Y, -100.0, -40.0)]);

    let mut session = FilterSession::init(dir.path(), "10,45,12,47").expect("init");
    assert!(session.index_available());

    let near = session
        .visit(Situation::Blob, blob(OID_X), FEATURE_PATH)
        .expect("near");
    assert!(shown(near.directive));
    assert!(!near.omit);

    let far = session
        .visit(Situation::Blob, blob(OID_Y), FEATURE_PATH)
        .expect("far");
    assert_eq!(far.directive, Directive::MARK_SEEN);
    assert!(far.omit);

    let stats = session.finish();
    assert_eq!(stats.matched, 1);
}

#[test]
fn cells_blob_without_indexed_cells_is_omitted() {
    let dir = TempDir::new().expect("tempdir");
    cells_fixture(dir.path(), &[(OID_X, 11.0, 46.0)]);

    let mut session = FilterSession::init(dir.path(), "10,45,12,47").expect("init");
    // OID_Z has no cell rows, so the existence join finds no shared cell.
    // Unlike the envelope schema, this schema cannot tell "never indexed"
    // from "indexed with disjoint cells".
    let visit = session
        .visit(Situation::Blob, blob(OID_Z), FEATURE_PATH)
        .expect("visit");
    assert_eq!(visit.directive, Directive::MARK_SEEN);
    assert!(visit.omit);
}

#[test]
fn cells_strategy_handles_antimeridian_bounds() {
    let dir = TempDir::new().expect("tempdir");
    cells_fixture(dir.path(), &[(OID_X, 179.5, 0.5), (OID_Y, -179.5, 0.5)]);

    let mut session = FilterSession::init(dir.path(), "179,-1,-179,1").expect("init");
    assert!(!session
        .visit(Situation::Blob, blob(OID_X), FEATURE_PATH)
        .expect("east side")
        .omit);
    assert!(!session
        .visit(Situation::Blob, blob(OID_Y), FEATURE_PATH)
        .expect("west side")
        .omit);
}

#[test]
fn non_feature_blobs_bypass_the_index() {
    let dir = TempDir::new().expect("tempdir");
    envelope_fixture(dir.path(), &[(OID_Y, 20.0, 20.0, 21.0, 21.0)]);

    let mut session = FilterSession::init(dir.path(), "10,45,12,47").expect("init");
    // Same far-away blob, but on a non-feature path: always included.
    let visit = session
        .visit(Situation::Blob, blob(OID_Y), "roads/meta/schema.json")
        .expect("visit");
    assert!(shown(visit.directive));
    assert!(!visit.omit);
}

#[test]
fn malformed_argument_fails_init_without_a_session() {
    let dir = TempDir::new().expect("tempdir");
    envelope_fixture(dir.path(), &[(OID_X, 11.0, 46.0, 13.0, 48.0)]);

    assert!(FilterSession::init(dir.path(), "1,2,3").is_err());
    assert!(FilterSession::init(dir.path(), "").is_err());
    assert!(FilterSession::init(dir.path(), "10,47,12,45").is_err());
}
