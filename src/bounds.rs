//! Query rectangle parsing and validation.
//!
//! The filter argument is a single string of four comma- or
//! whitespace-separated numbers in `west,south,east,north` order (longitudes
//! and latitudes in degrees). This is the only accepted form; a malformed
//! argument aborts session init before any object is visited.

use crate::error::{FilterError, Result};
use geo::Rect;
use serde::{Deserialize, Serialize};
use smallvec::{SmallVec, smallvec};
use std::fmt;
use std::str::FromStr;

/// Geodetic query rectangle, degrees, `west,south,east,north` convention.
///
/// `south <= north` always holds. `west > east` is valid and means the
/// rectangle crosses the antimeridian; longitudes are never wrapped or
/// normalized, so both must already lie in `[-180, 180]`.
///
/// Immutable once constructed; a session owns exactly one of these for its
/// whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QueryBounds {
    /// Western longitude bound.
    pub west: f64,
    /// Southern latitude bound.
    pub south: f64,
    /// Eastern longitude bound.
    pub east: f64,
    /// Northern latitude bound.
    pub north: f64,
}

impl QueryBounds {
    /// Build validated bounds from four degree values.
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Result<Self> {
        let bounds = Self {
            west,
            south,
            east,
            north,
        };
        bounds.validate()?;
        Ok(bounds)
    }

    /// Build bounds from a `geo` rectangle (min = south-west corner).
    ///
    /// Rectangles arriving this way can never cross the antimeridian, since
    /// `geo::Rect` keeps `min <= max` on both axes.
    pub fn from_rect(rect: Rect<f64>) -> Result<Self> {
        Self::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y)
    }

    /// Convert to a `geo` rectangle, or `None` for antimeridian-crossing
    /// bounds, which a single axis-aligned rectangle cannot represent.
    pub fn to_rect(&self) -> Option<Rect<f64>> {
        if self.crosses_antimeridian() {
            None
        } else {
            Some(Rect::new((self.west, self.south), (self.east, self.north)))
        }
    }

    /// Whether the rectangle wraps across the ±180° meridian.
    pub fn crosses_antimeridian(&self) -> bool {
        self.west > self.east
    }

    /// The one or two plain rectangles covering these bounds. An
    /// antimeridian-crossing rectangle splits at ±180°.
    pub(crate) fn split_rects(&self) -> SmallVec<[Rect<f64>; 2]> {
        if self.crosses_antimeridian() {
            smallvec![
                Rect::new((self.west, self.south), (180.0, self.north)),
                Rect::new((-180.0, self.south), (self.east, self.north)),
            ]
        } else {
            smallvec![Rect::new((self.west, self.south), (self.east, self.north))]
        }
    }

    fn validate(&self) -> Result<()> {
        let lat_ok = (-90.0..=90.0).contains(&self.south) && (-90.0..=90.0).contains(&self.north);
        let lng_ok = (-180.0..=180.0).contains(&self.west) && (-180.0..=180.0).contains(&self.east);
        if !lat_ok || !lng_ok {
            return Err(FilterError::Config(format!(
                "coordinates out of range in '{self}': latitudes must be in [-90, 90], \
                 longitudes in [-180, 180]"
            )));
        }
        if self.south > self.north {
            return Err(FilterError::Config(format!(
                "southern bound exceeds northern bound in '{self}'"
            )));
        }
        Ok(())
    }
}

impl FromStr for QueryBounds {
    type Err = FilterError;

    fn from_str(arg: &str) -> Result<Self> {
        let tokens: Vec<&str> = arg
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|t| !t.is_empty())
            .collect();
        if tokens.len() != 4 {
            return Err(FilterError::Config(format!(
                "expected '<lng_w>,<lat_s>,<lng_e>,<lat_n>', got '{arg}'"
            )));
        }
        let mut values = [0.0_f64; 4];
        for (value, token) in values.iter_mut().zip(&tokens) {
            *value = token.parse().map_err(|_| {
                FilterError::Config(format!("'{token}' in '{arg}' is not a number"))
            })?;
        }
        Self::new(values[0], values[1], values[2], values[3])
    }
}

impl fmt::Display for QueryBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.west, self.south, self.east, self.north)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comma_separated() {
        let bounds: QueryBounds = "10,45,12,47".parse().expect("valid bounds");
        assert_eq!(bounds, QueryBounds::new(10.0, 45.0, 12.0, 47.0).unwrap());
    }

    #[test]
    fn parses_whitespace_and_mixed_separators() {
        let bounds: QueryBounds = "10 45 12 47".parse().expect("valid bounds");
        assert_eq!(bounds.west, 10.0);
        let bounds: QueryBounds = " 10, 45 ,12,47 ".parse().expect("valid bounds");
        assert_eq!(bounds.north, 47.0);
    }

    #[test]
    fn rejects_wrong_token_count() {
        assert!("1,2,3".parse::<QueryBounds>().is_err());
        assert!("1,2,3,4,5".parse::<QueryBounds>().is_err());
        assert!("".parse::<QueryBounds>().is_err());
    }

    #[test]
    fn rejects_non_numeric_tokens() {
        assert!("a,b,c,d".parse::<QueryBounds>().is_err());
        assert!("10,45,twelve,47".parse::<QueryBounds>().is_err());
    }

    #[test]
    fn rejects_invalid_coordinates() {
        assert!("10,95,12,96".parse::<QueryBounds>().is_err());
        assert!("-190,45,12,47".parse::<QueryBounds>().is_err());
        // south above north
        assert!("10,47,12,45".parse::<QueryBounds>().is_err());
        // NaN never satisfies a range check
        assert!("NaN,45,12,47".parse::<QueryBounds>().is_err());
    }

    #[test]
    fn antimeridian_crossing_is_representable() {
        let bounds: QueryBounds = "170,-10,-170,10".parse().expect("valid bounds");
        assert!(bounds.crosses_antimeridian());
        assert!(bounds.to_rect().is_none());

        let rects = bounds.split_rects();
        assert_eq!(rects.len(), 2);
        assert_eq!(rects[0].max().x, 180.0);
        assert_eq!(rects[1].min().x, -180.0);
    }

    #[test]
    fn display_round_trips_through_parse() {
        for arg in ["10,45,12,47", "-180,-90,180,90", "170.25,-10.5,-170,10"] {
            let bounds: QueryBounds = arg.parse().expect("valid bounds");
            let reparsed: QueryBounds = bounds.to_string().parse().expect("round trip");
            assert_eq!(bounds, reparsed);
        }
    }

    #[test]
    fn rect_interop() {
        let bounds: QueryBounds = "10,45,12,47".parse().expect("valid bounds");
        let rect = bounds.to_rect().expect("not antimeridian-crossing");
        assert_eq!(QueryBounds::from_rect(rect).unwrap(), bounds);
    }
}
