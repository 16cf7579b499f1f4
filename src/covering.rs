//! Hierarchical cell covering of a query rectangle.
//!
//! Covering cells are geohash tokens: a base-32 hierarchical decomposition
//! of the lng/lat plane where every extra character subdivides a cell and an
//! ancestor cell is exactly a string prefix. The covering is built by
//! recursive subdivision — split the coarsest cell that intersects the query
//! without being contained in it, until the cell budget or the precision
//! bound stops refinement — and then merged back where a full sibling set
//! survived, trading precision for fewer tokens while staying a superset of
//! the query rectangle.
//!
//! Query terms derived from the covering include every ancestor prefix of
//! every covering cell, so a plain string-equality join against an index
//! that also stores ancestors detects any covering intersection. Ancestor
//! terms carry the reserved [`ANCESTOR_MARKER`]; strip it before using a
//! term as an index key.

use crate::bounds::QueryBounds;
use crate::config::FilterConfig;
use geo::Rect;
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

/// Geohash base-32 alphabet, in code order.
const BASE32: &[u8; 32] = b"0123456789bcdefghjkmnpqrstuvwxyz";

/// Reserved leading marker on ancestor query terms.
pub const ANCESTOR_MARKER: char = '$';

/// Strip the ancestor marker from a query term, yielding a plain index key.
pub fn strip_marker(term: &str) -> &str {
    term.strip_prefix(ANCESTOR_MARKER).unwrap_or(term)
}

/// A set of cells whose union contains a query rectangle.
///
/// Built once per session from the query bounds; never mutated afterwards.
/// Cell count stays within the configured budget except at precision 1,
/// where cells cannot be coarsened any further.
#[derive(Debug, Clone)]
pub struct CellCovering {
    cells: Vec<String>,
}

impl CellCovering {
    /// Cover `bounds` with at most `config.max_query_cells` cells of at most
    /// `config.max_cell_precision` characters.
    pub fn build(bounds: &QueryBounds, config: &FilterConfig) -> Self {
        let rects = bounds.split_rects();
        let query_area: f64 = rects.iter().map(|r| r.width() * r.height()).sum();

        let mut covering: Vec<String> = Vec::new();
        for &ch in BASE32 {
            let cell = (ch as char).to_string();
            if intersects_any(&cell_bbox(&cell), &rects) {
                covering.push(cell);
            }
        }

        // Cells that cannot be split without blowing the budget.
        let mut blocked: FxHashSet<String> = FxHashSet::default();

        loop {
            let Some(at) = pick_split(&covering, &rects, &blocked, query_area, config) else {
                break;
            };
            let cell = covering.swap_remove(at);
            let children = intersecting_children(&cell, &rects);
            if covering.len() + children.len() > config.max_query_cells {
                let _ = blocked.insert(cell.clone());
                covering.push(cell);
                continue;
            }
            covering.extend(children);
        }

        merge_full_siblings(&mut covering);
        covering.sort_unstable();
        Self { cells: covering }
    }

    /// The covering cells, sorted, duplicate-free by construction.
    pub fn cells(&self) -> &[String] {
        &self.cells
    }

    /// The query terms for the cell-token index: every covering cell plus
    /// every proper ancestor prefix, the latter carrying [`ANCESTOR_MARKER`].
    /// Ordered, duplicate-free.
    pub fn query_terms(&self) -> Vec<String> {
        let mut seen: FxHashSet<&str> = FxHashSet::default();
        let mut terms = Vec::new();
        for cell in &self.cells {
            if seen.insert(cell) {
                terms.push(cell.clone());
            }
            for end in 1..cell.len() {
                let ancestor = &cell[..end];
                if seen.insert(ancestor) {
                    terms.push(format!("{ANCESTOR_MARKER}{ancestor}"));
                }
            }
        }
        terms.sort_unstable();
        terms
    }
}

fn cell_bbox(cell: &str) -> Rect<f64> {
    // Tokens are generated from BASE32 only, so decoding cannot fail.
    geohash::decode_bbox(cell).expect("covering cells are valid geohashes")
}

/// Closed-interval rectangle intersection. Over-inclusive on shared edges,
/// which only ever adds cells to the covering — the superset property is
/// what matters here, not tightness.
fn rects_intersect(a: &Rect<f64>, b: &Rect<f64>) -> bool {
    a.min().x <= b.max().x
        && b.min().x <= a.max().x
        && a.min().y <= b.max().y
        && b.min().y <= a.max().y
}

fn intersects_any(cell: &Rect<f64>, rects: &[Rect<f64>]) -> bool {
    rects.iter().any(|r| rects_intersect(cell, r))
}

fn contained_in_any(cell: &Rect<f64>, rects: &[Rect<f64>]) -> bool {
    rects.iter().any(|r| {
        cell.min().x >= r.min().x
            && cell.max().x <= r.max().x
            && cell.min().y >= r.min().y
            && cell.max().y <= r.max().y
    })
}

/// Pick the coarsest covering cell still worth splitting: intersecting but
/// not contained, below the precision bound, not budget-blocked, and no
/// smaller than the budgeted share of the query area — cells far below that
/// share cannot tighten the covering within the cell budget.
fn pick_split(
    covering: &[String],
    rects: &[Rect<f64>],
    blocked: &FxHashSet<String>,
    query_area: f64,
    config: &FilterConfig,
) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, cell) in covering.iter().enumerate() {
        if cell.len() >= config.max_cell_precision || blocked.contains(cell) {
            continue;
        }
        let bbox = cell_bbox(cell);
        if contained_in_any(&bbox, rects) {
            continue;
        }
        let area = bbox.width() * bbox.height();
        if area * (config.max_query_cells as f64) < query_area {
            continue;
        }
        if best.is_none_or(|(_, a)| area > a) {
            best = Some((i, area));
        }
    }
    best.map(|(i, _)| i)
}

fn intersecting_children(cell: &str, rects: &[Rect<f64>]) -> SmallVec<[String; 32]> {
    let mut children = SmallVec::new();
    for &ch in BASE32 {
        let mut child = String::with_capacity(cell.len() + 1);
        child.push_str(cell);
        child.push(ch as char);
        if intersects_any(&cell_bbox(&child), rects) {
            children.push(child);
        }
    }
    children
}

/// Replace any complete set of 32 sibling cells by their parent, repeatedly.
/// The union of a full sibling set equals the parent exactly, so the
/// covering stays a superset while dropping 31 tokens.
fn merge_full_siblings(covering: &mut Vec<String>) {
    loop {
        let mut by_parent: FxHashMap<&str, usize> = FxHashMap::default();
        for cell in covering.iter() {
            if cell.len() >= 2 {
                *by_parent.entry(&cell[..cell.len() - 1]).or_insert(0) += 1;
            }
        }
        let Some(parent) = by_parent
            .into_iter()
            .find(|&(_, count)| count == BASE32.len())
            .map(|(parent, _)| parent.to_string())
        else {
            return;
        };
        covering.retain(|c| !(c.len() == parent.len() + 1 && c.starts_with(parent.as_str())));
        covering.push(parent);
    }
}
