//! Exact interval-overlap tests for stored feature envelopes.

use crate::bounds::QueryBounds;
use serde::{Deserialize, Serialize};

/// Whether two closed intervals `[a1, a2]` and `[b1, b2]` overlap.
///
/// Intervals that merely touch at a single boundary point do not overlap,
/// and two zero-width intervals at the same point do not overlap either. A
/// zero-width interval strictly inside a wider one does.
///
/// # Panics
///
/// Panics if either interval is inverted (`a1 > a2` or `b1 > b2`). That is a
/// programming error or corrupt index data, and aborting beats silently
/// producing a wrong filter decision.
pub fn ranges_overlap(a1: f64, a2: f64, b1: f64, b2: f64) -> bool {
    assert!(
        a1 <= a2 && b1 <= b2,
        "ranges don't make sense: [{a1}, {a2}] vs [{b1}, {b2}]"
    );
    if b1 < a1 {
        // `b` starts to the left of `a`, so they intersect if `b` finishes
        // to the right of where `a` starts.
        return b2 > a1;
    }
    if a1 < b1 {
        return a2 > b1;
    }
    // Same left edge; they must intersect unless one of them is zero-width.
    b2 != b1 && a2 != a1
}

/// Axis-aligned bounding envelope of an indexed feature, in degrees.
///
/// This is the per-blob extent stored by the envelope-schema index:
/// `(west, south, east, north)`, always with `w <= e` and `s <= n`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Western longitude bound.
    pub w: f64,
    /// Southern latitude bound.
    pub s: f64,
    /// Eastern longitude bound.
    pub e: f64,
    /// Northern latitude bound.
    pub n: f64,
}

impl Envelope {
    /// Build an envelope from four degree values.
    pub fn new(w: f64, s: f64, e: f64, n: f64) -> Self {
        Self { w, s, e, n }
    }

    /// Whether this envelope intersects the query rectangle: interval
    /// overlap on both axes independently.
    ///
    /// Longitudes are compared as plain numeric ranges. An envelope or query
    /// crossing the antimeridian is not representable here; sessions using
    /// the envelope strategy reject antimeridian-crossing bounds at init.
    pub fn intersects_bounds(&self, bounds: &QueryBounds) -> bool {
        ranges_overlap(self.w, self.e, bounds.west, bounds.east)
            && ranges_overlap(self.s, self.n, bounds.south, bounds.north)
    }
}
