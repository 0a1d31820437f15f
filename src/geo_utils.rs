//! # Geographic Utilities
//!
//! Small coordinate helpers shared by the pipeline stages.
//!
//! ## Overview
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`compute_bounds`] | Bounding box of a coordinate list |
//! | [`collection_bounds`] | Bounding box of many segments |
//! | [`dedup_consecutive`] | Drop repeated consecutive vertices |
//!
//! ## Coordinate System
//!
//! Coordinates are `geo::Coord` with `x` = longitude and `y` = latitude (WGS84 degrees),
//! the order GeoJSON and OSM use.

use geo::Coord;

use crate::{Bounds, RailSegment};

// =============================================================================
// Bounding Box Functions
// =============================================================================

/// Compute the bounding box of a coordinate list.
///
/// For empty input returns bounds with MIN/MAX values; prefer [`Bounds::from_coords`]
/// when the input may be empty.
pub fn compute_bounds(coords: &[Coord<f64>]) -> Bounds {
    let mut min_lat = f64::MAX;
    let mut max_lat = f64::MIN;
    let mut min_lng = f64::MAX;
    let mut max_lng = f64::MIN;

    for c in coords {
        min_lat = min_lat.min(c.y);
        max_lat = max_lat.max(c.y);
        min_lng = min_lng.min(c.x);
        max_lng = max_lng.max(c.x);
    }

    Bounds { min_lat, max_lat, min_lng, max_lng }
}

/// Bounding box of every coordinate in `segments`, or `None` if there are none.
pub fn collection_bounds(segments: &[RailSegment]) -> Option<Bounds> {
    segments
        .iter()
        .filter_map(|s| s.bounds())
        .reduce(|acc, b| acc.union(&b))
}

// =============================================================================
// Vertex Helpers
// =============================================================================

/// Remove consecutive duplicate vertices.
///
/// OSM ways occasionally repeat a node, and boolean-op output rings can contain
/// zero-length edges; both break direction vectors.
pub fn dedup_consecutive(coords: &[Coord<f64>]) -> Vec<Coord<f64>> {
    let mut out: Vec<Coord<f64>> = Vec::with_capacity(coords.len());
    for &c in coords {
        if out.last() != Some(&c) {
            out.push(c);
        }
    }
    out
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_bounds() {
        let coords = vec![
            Coord { x: -0.13, y: 51.50 },
            Coord { x: -0.12, y: 51.51 },
            Coord { x: -0.125, y: 51.505 },
        ];
        let bounds = compute_bounds(&coords);
        assert_eq!(bounds.min_lat, 51.50);
        assert_eq!(bounds.max_lat, 51.51);
        assert_eq!(bounds.min_lng, -0.13);
        assert_eq!(bounds.max_lng, -0.12);
    }

    #[test]
    fn test_collection_bounds() {
        let segments = vec![
            RailSegment::from_lon_lat(1, &[(0.0, 0.0), (1.0, 1.0)]),
            RailSegment::from_lon_lat(2, &[(-1.0, 2.0), (0.5, 0.5)]),
        ];
        let bounds = collection_bounds(&segments).unwrap();
        assert_eq!(bounds.min_lng, -1.0);
        assert_eq!(bounds.max_lat, 2.0);
        assert!(collection_bounds(&[]).is_none());
    }

    #[test]
    fn test_dedup_consecutive() {
        let coords = vec![
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 1.0, y: 0.0 },
            Coord { x: 0.0, y: 0.0 },
        ];
        assert_eq!(dedup_consecutive(&coords).len(), 3);
    }
}
