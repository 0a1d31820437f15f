//! # Region Pipeline
//!
//! Runs every stage for one region, strictly in order:
//!
//! 1. Buffer each centerline into a corridor
//! 2. Simplify corridors
//! 3. Generate cut lines on the union outline
//! 4. Pre-merge duplicated corridors (permissive threshold)
//! 5. Split the merged polygons along the cut lines
//! 6. Clip to the region boundary
//! 7. Post-merge fragments that still share area (strict threshold)
//! 8. Measure areas
//!
//! Cut lines are computed before the pre-merge, from the simplified corridors, so
//! the notch between two diverging lines is still visible when the corridors are
//! later fused.

use std::time::Instant;

use geo::{BoundingRect, MultiPolygon};
use log::{debug, info};

use crate::buffer::simplify_polygons;
use crate::geo_utils::collection_bounds;
use crate::{
    buffer_segments, clip_to_boundary, compute_areas, generate_cut_lines, merge_overlapping, split_polygons,
    Bounds, CoverageConfig, CoverageReport, MetricProjection, RailSegment, Result,
};

/// Result of one region run.
#[derive(Debug, Clone)]
pub struct RegionCoverage {
    pub region: String,
    /// Projection every metric step of this run used
    pub projection: MetricProjection,
    pub report: CoverageReport,
}

impl RegionCoverage {
    fn empty(region: &str, projection: MetricProjection) -> Self {
        Self {
            region: region.to_string(),
            projection,
            report: CoverageReport { polygons: vec![], total_area_m2: 0.0 },
        }
    }
}

/// Pick the run's projection from the data extent, falling back to the boundary.
pub fn projection_for(
    segments: &[RailSegment],
    boundary: Option<&MultiPolygon<f64>>,
    config: &CoverageConfig,
) -> MetricProjection {
    let bounds = collection_bounds(segments).or_else(|| {
        boundary.and_then(|b| b.bounding_rect()).map(|r| Bounds {
            min_lat: r.min().y,
            max_lat: r.max().y,
            min_lng: r.min().x,
            max_lng: r.max().x,
        })
    });
    match bounds {
        Some(b) => MetricProjection::for_bounds(config.projection, &b),
        None => MetricProjection::web_mercator(),
    }
}

/// Turn the centerlines of one region into measured coverage polygons.
///
/// Degenerate segments are skipped. A missing boundary skips clipping. Projection
/// failures and malformed boundaries fail the region.
pub fn process_region(
    region: &str,
    segments: &[RailSegment],
    boundary: Option<&MultiPolygon<f64>>,
    config: &CoverageConfig,
) -> Result<RegionCoverage> {
    let start = Instant::now();
    let projection = projection_for(segments, boundary, config);
    debug!("[Pipeline] {}: projection {:?}", region, projection);

    if segments.is_empty() {
        info!("[Pipeline] {}: no railway segments, empty coverage", region);
        return Ok(RegionCoverage::empty(region, projection));
    }

    let step = Instant::now();
    let mut polygons = buffer_segments(segments, config.buffer_radius_m, &projection)?;
    debug!("[Pipeline] {}: buffered in {:?}", region, step.elapsed());

    if let Some(tolerance) = config.simplify_tolerance_deg {
        polygons = simplify_polygons(polygons, tolerance);
    }

    let step = Instant::now();
    let cut_lines = generate_cut_lines(&polygons, &projection, config)?;
    debug!("[Pipeline] {}: cut lines in {:?}", region, step.elapsed());

    let step = Instant::now();
    let merged = merge_overlapping(&polygons, &config.pre_merge, &projection)?;
    debug!("[Pipeline] {}: pre-merged in {:?}", region, step.elapsed());

    let step = Instant::now();
    let pieces = split_polygons(merged, &cut_lines, &projection, config.split_gap_m);
    debug!("[Pipeline] {}: split in {:?}", region, step.elapsed());

    let clipped = clip_to_boundary(region, pieces, boundary)?;

    let step = Instant::now();
    let fused = merge_overlapping(&clipped, &config.post_merge, &projection)?;
    debug!("[Pipeline] {}: post-merged in {:?}", region, step.elapsed());

    let report = compute_areas(fused, &projection)?;
    info!(
        "[Pipeline] {}: {} segments -> {} polygons, {:.0} m² in {:?}",
        region,
        segments.len(),
        report.len(),
        report.total_area_m2,
        start.elapsed()
    );

    Ok(RegionCoverage {
        region: region.to_string(),
        projection,
        report,
    })
}
