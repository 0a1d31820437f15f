//! Line buffering: rail centerline → corridor polygon.
//!
//! Each centerline is projected onto the run's metric plane, offset by the buffer
//! radius with round joins and caps, and mapped back to WGS84. Degenerate ways are
//! reported per segment and skipped by the batch functions; projection failures abort
//! the batch.

use geo::{Buffer, LineString, MultiPolygon, Simplify};
use log::{debug, info, warn};

use crate::geo_utils::dedup_consecutive;
use crate::{CoverageError, CoveragePolygon, MetricProjection, PolygonId, RailSegment, Result};

/// Buffer one segment by `radius_m` meters.
///
/// Fails with [`CoverageError::DegenerateGeometry`] when the segment has fewer than
/// two distinct points or zero length, and with [`CoverageError::ProjectionFailure`]
/// when a coordinate cannot be projected.
///
/// # Example
/// ```
/// use rail_coverage::{buffer_segment, MetricProjection, RailSegment};
///
/// let seg = RailSegment::from_lon_lat(1, &[(0.0, 0.0), (0.01, 0.0)]);
/// let poly = buffer_segment(&seg, 50.0, &MetricProjection::web_mercator()).unwrap();
/// assert_eq!(poly.geometry.0.len(), 1);
/// ```
pub fn buffer_segment(
    segment: &RailSegment,
    radius_m: f64,
    projection: &MetricProjection,
) -> Result<CoveragePolygon> {
    let degenerate = |reason: &str| CoverageError::DegenerateGeometry {
        segment: segment.id,
        reason: reason.to_string(),
    };

    if !(radius_m.is_finite() && radius_m > 0.0) {
        return Err(degenerate("buffer radius must be positive"));
    }

    let coords = dedup_consecutive(&segment.coords);
    if coords.len() < 2 {
        return Err(degenerate("fewer than 2 distinct points"));
    }

    let projected = projection.project(&LineString::new(coords))?;
    if planar_length(&projected) <= f64::EPSILON {
        return Err(degenerate("zero-length line"));
    }

    let corridor: MultiPolygon<f64> = projected.buffer(radius_m);
    if corridor.0.is_empty() {
        return Err(degenerate("buffer produced no polygon"));
    }

    let geometry = projection.unproject(&corridor)?;
    Ok(CoveragePolygon::new(PolygonId::Segment(segment.id), geometry))
}

/// Buffer every segment, keeping input order.
///
/// Degenerate segments are logged and skipped. Any other error aborts the batch.
pub fn buffer_segments(
    segments: &[RailSegment],
    radius_m: f64,
    projection: &MetricProjection,
) -> Result<Vec<CoveragePolygon>> {
    #[cfg(feature = "parallel")]
    let results: Vec<Result<CoveragePolygon>> = {
        use rayon::prelude::*;
        segments
            .par_iter()
            .map(|s| buffer_segment(s, radius_m, projection))
            .collect()
    };

    #[cfg(not(feature = "parallel"))]
    let results: Vec<Result<CoveragePolygon>> = segments
        .iter()
        .map(|s| buffer_segment(s, radius_m, projection))
        .collect();

    let mut polygons = Vec::with_capacity(results.len());
    let mut skipped = 0usize;
    for result in results {
        match result {
            Ok(polygon) => polygons.push(polygon),
            Err(e) if e.is_local() => {
                warn!("[Buffer] Skipping segment: {}", e);
                skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }

    info!(
        "[Buffer] Buffered {} of {} segments at {}m ({} skipped)",
        polygons.len(),
        segments.len(),
        radius_m,
        skipped
    );
    Ok(polygons)
}

/// Douglas-Peucker simplify each polygon in degree space.
///
/// Output may be invalid; later stages repair geometry before trusting predicates or
/// areas. Polygons that collapse entirely are dropped.
pub fn simplify_polygons(polygons: Vec<CoveragePolygon>, tolerance_deg: f64) -> Vec<CoveragePolygon> {
    let before = polygons.len();
    let simplified: Vec<CoveragePolygon> = polygons
        .into_iter()
        .filter_map(|mut p| {
            p.geometry = p.geometry.simplify(tolerance_deg);
            p.geometry.0.retain(|poly| poly.exterior().0.len() >= 4);
            (!p.is_empty()).then_some(p)
        })
        .collect();

    debug!(
        "[Buffer] Simplified {} polygons at {} deg ({} dropped)",
        simplified.len(),
        tolerance_deg,
        before - simplified.len()
    );
    simplified
}

fn planar_length(line: &LineString<f64>) -> f64 {
    line.lines().map(|l| l.dx().hypot(l.dy())).sum()
}
