//! # Rail Coverage
//!
//! Turns railway centerlines into coverage polygons with an accurate total area.
//!
//! This library provides:
//! - Corridor buffering of rail lines in a locally-metric projection
//! - Corner cut lines that separate corridors fused only by proximity
//! - Overlap clustering (pre-merge and post-cut cleanup)
//! - Boundary clipping, area computation and GeoJSON export
//! - A per-subdivision runner for whole countries
//!
//! ## Features
//!
//! - **`parallel`** - Parallel buffering and a worker pool for subdivisions (rayon)
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use rail_coverage::{RailSegment, CoverageConfig, process_region};
//!
//! // Two ~1.1 km lines, ~80 m apart, near the equator
//! let a = RailSegment::from_lon_lat(1, &[(0.0, 0.0), (0.01, 0.0)]);
//! let b = RailSegment::from_lon_lat(2, &[(0.0, 0.00072), (0.01, 0.00072)]);
//!
//! let coverage = process_region("XX", &[a, b], None, &CoverageConfig::default()).unwrap();
//! println!("{} polygons, {:.0} m²", coverage.report.len(), coverage.report.total_area_m2);
//! ```

use geo::{Coord, LineString, MultiPolygon};
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod error;
pub use error::{CoverageError, Result};

pub mod geo_utils;

pub mod projection;
pub use projection::{MetricProjection, ProjectionKind};

// Pipeline stages, in execution order
pub mod buffer;
pub use buffer::{buffer_segment, buffer_segments};

pub mod cut_lines;
pub use cut_lines::generate_cut_lines;

pub mod cluster;
pub use cluster::{find_clusters, merge_overlapping, OverlapCluster, OverlapThreshold};

pub mod split;
pub use split::split_polygons;

pub mod clip;
pub use clip::{boundary_from_geojson, clip_to_boundary};

pub mod area;
pub use area::{compute_areas, CoverageReport};

pub mod export;
pub use export::{to_feature_collection, to_geojson_string, write_geojson};

// Inputs
pub mod topology;
pub use topology::{overpass_query, RailTopology, Way};

pub mod filter;
pub use filter::{AcceptAll, RailwayFilter, RailwayTagFilter};

// Orchestration
pub mod pipeline;
pub use pipeline::{process_region, projection_for, RegionCoverage};

pub mod regions;
pub use regions::{
    default_worker_count, run_country, BoundaryProvider, CountryCoverage, CountryJob, RailSource, RegionOutcome,
};

// ============================================================================
// Core Types
// ============================================================================

/// Bounding box in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Create bounds from `(lon, lat)` coordinates.
    pub fn from_coords(coords: &[Coord<f64>]) -> Option<Self> {
        if coords.is_empty() {
            return None;
        }
        Some(geo_utils::compute_bounds(coords))
    }

    /// Smallest bounds containing both.
    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds {
            min_lat: self.min_lat.min(other.min_lat),
            max_lat: self.max_lat.max(other.max_lat),
            min_lng: self.min_lng.min(other.min_lng),
            max_lng: self.max_lng.max(other.max_lng),
        }
    }

    /// Center as a `(lon, lat)` coordinate.
    pub fn center(&self) -> Coord<f64> {
        Coord {
            x: (self.min_lng + self.max_lng) / 2.0,
            y: (self.min_lat + self.max_lat) / 2.0,
        }
    }
}

/// One railway way: an ordered centerline in WGS84 `(lon, lat)` with its OSM id.
#[derive(Debug, Clone, PartialEq)]
pub struct RailSegment {
    /// Stable identifier (OSM way id)
    pub id: i64,
    /// Centerline coordinates, `x` = longitude, `y` = latitude
    pub coords: Vec<Coord<f64>>,
}

impl RailSegment {
    pub fn new(id: i64, coords: Vec<Coord<f64>>) -> Self {
        Self { id, coords }
    }

    /// Create a segment from `(lon, lat)` pairs.
    ///
    /// # Example
    /// ```
    /// use rail_coverage::RailSegment;
    /// let seg = RailSegment::from_lon_lat(7, &[(13.37, 52.52), (13.38, 52.52)]);
    /// assert_eq!(seg.coords.len(), 2);
    /// ```
    pub fn from_lon_lat(id: i64, points: &[(f64, f64)]) -> Self {
        Self {
            id,
            coords: points.iter().map(|&(x, y)| Coord { x, y }).collect(),
        }
    }

    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_coords(&self.coords)
    }
}

/// Who a coverage polygon belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PolygonId {
    /// Buffered corridor of a single way
    Segment(i64),
    /// Merged component produced by the overlap clusterer
    Cluster(u32),
}

impl fmt::Display for PolygonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolygonId::Segment(id) => write!(f, "way/{}", id),
            PolygonId::Cluster(n) => write!(f, "cluster/{}", n),
        }
    }
}

/// A (possibly multi-part) coverage polygon in WGS84.
#[derive(Debug, Clone, PartialEq)]
pub struct CoveragePolygon {
    pub id: PolygonId,
    pub geometry: MultiPolygon<f64>,
    /// Area in square meters, set by [`compute_areas`]
    pub area_m2: Option<f64>,
}

impl CoveragePolygon {
    pub fn new(id: PolygonId, geometry: MultiPolygon<f64>) -> Self {
        Self { id, geometry, area_m2: None }
    }

    pub fn is_empty(&self) -> bool {
        self.geometry.0.is_empty()
    }
}

/// A three-point incision `[entry, corner, exit]` placed at a sharp outline corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CutLine {
    pub points: [Coord<f64>; 3],
}

impl CutLine {
    pub fn new(entry: Coord<f64>, corner: Coord<f64>, exit: Coord<f64>) -> Self {
        Self { points: [entry, corner, exit] }
    }

    pub fn entry(&self) -> Coord<f64> {
        self.points[0]
    }

    pub fn corner(&self) -> Coord<f64> {
        self.points[1]
    }

    pub fn exit(&self) -> Coord<f64> {
        self.points[2]
    }

    pub fn line_string(&self) -> LineString<f64> {
        LineString::new(self.points.to_vec())
    }
}

/// Configuration for a coverage pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverageConfig {
    /// Corridor half-width around each rail centerline.
    /// Default: 50.0 meters
    pub buffer_radius_m: f64,

    /// Douglas-Peucker tolerance applied to buffered corridors (in degrees).
    /// `None` disables simplification. Default: 0.00002 (~2 meters)
    pub simplify_tolerance_deg: Option<f64>,

    /// Outline corners with an angle strictly below this get a cut line.
    /// Default: 90.0 degrees
    pub corner_max_angle_deg: f64,

    /// Length of each arm of a cut line.
    /// Default: 200.0 meters
    pub cut_length_m: f64,

    /// Width of the strip removed along a cut line when splitting.
    /// Default: 0.05 meters
    pub split_gap_m: f64,

    /// Threshold for the permissive merge before cutting.
    /// Default: overlap > 50% of the smaller polygon, or > 5000 m²
    pub pre_merge: OverlapThreshold,

    /// Threshold for the cleanup merge after cutting and clipping.
    /// Default: overlap > 0.01 m²
    pub post_merge: OverlapThreshold,

    /// Metric plane used for buffering, corners, overlaps and areas.
    /// Default: local Mercator at the region's mid-latitude
    pub projection: ProjectionKind,
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            buffer_radius_m: 50.0,
            simplify_tolerance_deg: Some(0.000_02),
            corner_max_angle_deg: 90.0,
            cut_length_m: 200.0,
            split_gap_m: 0.05,
            pre_merge: OverlapThreshold::pre_merge(),
            post_merge: OverlapThreshold::post_merge(),
            projection: ProjectionKind::default(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
