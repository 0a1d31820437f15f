//! # Corner Cut-Line Generator
//!
//! Finds sharp corners on the outline of the union of all buffered corridors and
//! emits a short incision at each one.
//!
//! ## Algorithm
//! 1. Project every corridor onto the metric plane and union them
//! 2. Walk every ring of the union (exteriors and holes) cyclically
//! 3. Flag vertex `b` (neighbors `a`, `c`) when the angle between `b→a` and `b→c`
//!    is strictly below the threshold (90° by default)
//! 4. At each flagged corner build the perpendiculars of both adjacent edges, orient
//!    each against the opposite edge, extend them by the cut length, and emit
//!    `[arm_1, corner, arm_2]`
//! 5. Map the cut lines back to WGS84
//!
//! Where two corridors diverge at an acute angle, the union outline forms a narrow
//! notch. Cutting across the notch separates corridors that were fused only because
//! they run close together near the junction.

use geo::{unary_union, Coord, LineString, MultiPolygon};
use log::{debug, info};

use crate::geo_utils::dedup_consecutive;
use crate::{CoverageConfig, CoveragePolygon, CutLine, MetricProjection, Result};

/// A flagged outline vertex with its ring neighbors, in plane coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SharpCorner {
    pub corner: Coord<f64>,
    pub prev: Coord<f64>,
    pub next: Coord<f64>,
    /// Angle at `corner` in degrees
    pub angle_deg: f64,
}

/// Generate cut lines for the union outline of `polygons`.
///
/// Returns cut lines in WGS84. Empty input gives empty output.
pub fn generate_cut_lines(
    polygons: &[CoveragePolygon],
    projection: &MetricProjection,
    config: &CoverageConfig,
) -> Result<Vec<CutLine>> {
    if polygons.is_empty() {
        return Ok(vec![]);
    }

    let projected: Vec<MultiPolygon<f64>> = polygons
        .iter()
        .map(|p| projection.project(&p.geometry))
        .collect::<Result<_>>()?;
    let merged = unary_union(projected.iter());

    let mut corners = Vec::new();
    let mut ring_count = 0usize;
    for polygon in &merged {
        for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
            ring_count += 1;
            corners.extend(find_sharp_corners(ring, config.corner_max_angle_deg));
        }
    }
    debug!(
        "[CutLines] {} rings in union outline, {} sharp corners",
        ring_count,
        corners.len()
    );

    let cut_lines = corners
        .iter()
        .filter_map(|c| cut_line_at(c, config.cut_length_m))
        .map(|cut| unproject_cut(&cut, projection))
        .collect::<Result<Vec<_>>>()?;

    info!("[CutLines] Generated {} cut lines", cut_lines.len());
    Ok(cut_lines)
}

/// Collect corners of a closed ring whose angle is strictly below `max_angle_deg`.
///
/// The ring is walked cyclically over its distinct vertices, so the vertex that opens
/// and closes the ring is examined like any other. An open walk over the interior
/// indices `1..len - 1` would skip it, and where the ring starts depends on the
/// boolean-op output rather than on the geometry. Rings with fewer than three
/// distinct vertices have no corners.
pub fn find_sharp_corners(ring: &LineString<f64>, max_angle_deg: f64) -> Vec<SharpCorner> {
    let mut pts = dedup_consecutive(&ring.0);
    if pts.len() > 1 && pts.first() == pts.last() {
        pts.pop();
    }
    let n = pts.len();
    if n < 3 {
        return vec![];
    }

    (0..n)
        .filter_map(|i| {
            let prev = pts[(i + n - 1) % n];
            let corner = pts[i];
            let next = pts[(i + 1) % n];
            let angle_deg = corner_angle_deg(prev, corner, next)?;
            (angle_deg < max_angle_deg).then_some(SharpCorner { corner, prev, next, angle_deg })
        })
        .collect()
}

/// Angle at `b` between `b→a` and `b→c` in degrees, in `[0, 180]`.
///
/// `None` when either edge has zero length.
pub fn corner_angle_deg(a: Coord<f64>, b: Coord<f64>, c: Coord<f64>) -> Option<f64> {
    let ba = a - b;
    let bc = c - b;
    let norms = norm(ba) * norm(bc);
    if norms == 0.0 || !norms.is_finite() {
        return None;
    }
    let cosine = (dot(ba, bc) / norms).clamp(-1.0, 1.0);
    Some(cosine.acos().to_degrees())
}

/// Build the incision for one corner, in plane coordinates.
pub fn cut_line_at(corner: &SharpCorner, length: f64) -> Option<CutLine> {
    let v1 = unit(corner.corner - corner.prev)?;
    let v2 = unit(corner.corner - corner.next)?;

    // An arm is flipped when it makes an obtuse angle with the opposite edge direction
    let mut arm1 = perp(v1);
    if dot(arm1, v2) < 0.0 {
        arm1 = -arm1;
    }
    let mut arm2 = perp(v2);
    if dot(arm2, v1) < 0.0 {
        arm2 = -arm2;
    }

    let c = corner.corner;
    Some(CutLine::new(c + arm1 * length, c, c + arm2 * length))
}

fn unproject_cut(cut: &CutLine, projection: &MetricProjection) -> Result<CutLine> {
    Ok(CutLine::new(
        projection.inverse(cut.entry())?,
        projection.inverse(cut.corner())?,
        projection.inverse(cut.exit())?,
    ))
}

#[inline]
fn dot(a: Coord<f64>, b: Coord<f64>) -> f64 {
    a.x * b.x + a.y * b.y
}

#[inline]
fn norm(v: Coord<f64>) -> f64 {
    v.x.hypot(v.y)
}

#[inline]
fn perp(v: Coord<f64>) -> Coord<f64> {
    Coord { x: -v.y, y: v.x }
}

fn unit(v: Coord<f64>) -> Option<Coord<f64>> {
    let n = norm(v);
    (n > 0.0 && n.is_finite()).then(|| v / n)
}
