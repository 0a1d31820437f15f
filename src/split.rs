//! Polygon splitting along cut lines.
//!
//! A cut is realised as the difference with a thin strip around the cut line in the
//! metric plane. A polygon is replaced by the resulting pieces only when the strip
//! separates it into more parts than it had; otherwise it is kept as it was, so a
//! cut that merely nicks a polygon leaves no slit behind.

use geo::{Area, BooleanOps, Buffer, Intersects, LineString, MultiPolygon, Polygon};
use log::{debug, info, warn};

use crate::cluster::repair;
use crate::{CoverageError, CoveragePolygon, CutLine, MetricProjection, Result};

/// Pieces smaller than this (m²) are boolean-op slivers, not real fragments.
const MIN_PIECE_AREA_M2: f64 = 0.01;

/// Polygon plus its planar form, if it could be projected
struct Working {
    polygon: CoveragePolygon,
    planar: Option<MultiPolygon<f64>>,
}

/// Apply every cut line, in order, to every current polygon.
///
/// Returns at least as many polygons as it receives. Split pieces keep the owner id
/// of the polygon they came from. Failures are local: the affected polygon is kept.
pub fn split_polygons(
    polygons: Vec<CoveragePolygon>,
    cut_lines: &[CutLine],
    projection: &MetricProjection,
    gap_m: f64,
) -> Vec<CoveragePolygon> {
    if cut_lines.is_empty() || polygons.is_empty() {
        return polygons;
    }
    let before = polygons.len();

    let mut working: Vec<Working> = polygons
        .into_iter()
        .map(|polygon| {
            let planar = projection.project(&polygon.geometry).ok().map(|g| repair(&g));
            if planar.is_none() {
                warn!("[Split] Polygon {} cannot be projected, leaving it whole", polygon.id);
            }
            Working { polygon, planar }
        })
        .collect();

    let mut splits = 0usize;
    for cut in cut_lines {
        let strip = match cut_strip(cut, projection, gap_m) {
            Ok(strip) => strip,
            Err(e) => {
                warn!("[Split] Skipping cut line: {}", e);
                continue;
            }
        };

        let mut next = Vec::with_capacity(working.len());
        for item in working {
            match try_split(&item, &strip, projection) {
                Ok(pieces) => {
                    splits += 1;
                    next.extend(pieces);
                }
                Err(e) => {
                    debug!("[Split] {}: {}", item.polygon.id, e);
                    next.push(item);
                }
            }
        }
        working = next;
    }

    info!(
        "[Split] {} cut lines, {} splits: {} -> {} polygons",
        cut_lines.len(),
        splits,
        before,
        working.len()
    );
    working.into_iter().map(|w| w.polygon).collect()
}

/// The cut line buffered by half the gap on each side, in plane coordinates.
fn cut_strip(cut: &CutLine, projection: &MetricProjection, gap_m: f64) -> Result<MultiPolygon<f64>> {
    if !(gap_m.is_finite() && gap_m > 0.0) {
        return Err(CoverageError::SplitFailure(format!("invalid split gap {}", gap_m)));
    }
    let line: LineString<f64> = projection
        .project(&cut.line_string())
        .map_err(|e| CoverageError::SplitFailure(e.to_string()))?;
    let strip = line.buffer(gap_m / 2.0);
    if strip.0.is_empty() {
        return Err(CoverageError::SplitFailure("degenerate cut line".to_string()));
    }
    Ok(strip)
}

fn try_split(item: &Working, strip: &MultiPolygon<f64>, projection: &MetricProjection) -> Result<Vec<Working>> {
    let planar = item
        .planar
        .as_ref()
        .ok_or_else(|| CoverageError::SplitFailure("polygon has no planar form".to_string()))?;

    if !planar.intersects(strip) {
        return Err(CoverageError::SplitFailure("cut line does not cross polygon".to_string()));
    }

    let parts = planar.0.iter().filter(|p| p.unsigned_area() > MIN_PIECE_AREA_M2).count();
    let pieces: Vec<Polygon<f64>> = planar
        .difference(strip)
        .into_iter()
        .filter(|p| p.unsigned_area() > MIN_PIECE_AREA_M2)
        .collect();
    if pieces.len() <= parts {
        return Err(CoverageError::SplitFailure(format!(
            "cut does not separate polygon ({} parts after cut)",
            pieces.len()
        )));
    }

    pieces
        .into_iter()
        .map(|piece| {
            let geometry = projection
                .unproject(&piece)
                .map_err(|e| CoverageError::SplitFailure(e.to_string()))?;
            Ok(Working {
                polygon: CoveragePolygon::new(item.polygon.id, MultiPolygon::new(vec![geometry])),
                planar: Some(MultiPolygon::new(vec![piece])),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{buffer_segment, generate_cut_lines, CoverageConfig, PolygonId, RailSegment};
    use geo::Coord;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    fn square(id: i64, size: f64, p: &MetricProjection) -> CoveragePolygon {
        let plane = Polygon::new(
            LineString::from(vec![(0.0, 0.0), (size, 0.0), (size, size), (0.0, size), (0.0, 0.0)]),
            vec![],
        );
        CoveragePolygon::new(PolygonId::Segment(id), MultiPolygon::new(vec![p.unproject(&plane).unwrap()]))
    }

    /// Cut line given in plane meters.
    fn plane_cut(points: [(f64, f64); 3], p: &MetricProjection) -> CutLine {
        let to_wgs84 = |(x, y): (f64, f64)| p.inverse(Coord { x, y }).unwrap();
        CutLine::new(to_wgs84(points[0]), to_wgs84(points[1]), to_wgs84(points[2]))
    }

    fn total_area(polygons: &[CoveragePolygon], p: &MetricProjection) -> f64 {
        polygons.iter().map(|c| p.project(&c.geometry).unwrap().unsigned_area()).sum()
    }

    #[test]
    fn test_no_cut_lines_is_identity() {
        let p = MetricProjection::web_mercator();
        let polygons = vec![square(1, 100.0, &p)];
        let out = split_polygons(polygons.clone(), &[], &p, 0.05);
        assert_eq!(out, polygons);
    }

    #[test]
    fn test_cut_missing_polygon_keeps_original() {
        let p = MetricProjection::web_mercator();
        let polygons = vec![square(1, 100.0, &p)];
        let cut = plane_cut([(500.0, 0.0), (500.0, 50.0), (500.0, 100.0)], &p);
        let out = split_polygons(polygons.clone(), &[cut], &p, 0.05);
        assert_eq!(out, polygons);
    }

    #[test]
    fn test_cut_that_only_nicks_keeps_original() {
        let p = MetricProjection::web_mercator();
        let polygons = vec![square(1, 100.0, &p)];
        // Enters the square but stops halfway
        let cut = plane_cut([(50.0, -50.0), (50.0, 0.0), (50.0, 40.0)], &p);
        let out = split_polygons(polygons.clone(), &[cut], &p, 0.05);
        assert_eq!(out, polygons);
    }

    #[test]
    fn test_crossing_cut_splits_in_two() {
        let p = MetricProjection::web_mercator();
        let cut = plane_cut([(50.0, -50.0), (50.0, 50.0), (50.0, 150.0)], &p);
        let out = split_polygons(vec![square(7, 100.0, &p)], &[cut], &p, 0.05);

        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|c| c.id == PolygonId::Segment(7)));
        // Only the 0.05 m strip is lost
        assert!(approx_eq(total_area(&out, &p), 10_000.0 - 5.0, 0.5));
    }

    #[test]
    fn test_sliver_part_does_not_block_split() {
        let p = MetricProjection::web_mercator();
        let mut polygon = square(7, 100.0, &p);
        // 0.05 m x 0.05 m part well away from the cut
        let sliver = Polygon::new(
            LineString::from(vec![(300.0, 0.0), (300.05, 0.0), (300.05, 0.05), (300.0, 0.05), (300.0, 0.0)]),
            vec![],
        );
        polygon.geometry.0.push(p.unproject(&sliver).unwrap());

        let cut = plane_cut([(50.0, -50.0), (50.0, 50.0), (50.0, 150.0)], &p);
        let out = split_polygons(vec![polygon], &[cut], &p, 0.05);

        assert_eq!(out.len(), 2);
        assert!(approx_eq(total_area(&out, &p), 10_000.0 - 5.0, 0.5));
    }

    #[test]
    fn test_reapplying_cut_is_noop() {
        let p = MetricProjection::web_mercator();
        let cut = plane_cut([(50.0, -50.0), (50.0, 50.0), (50.0, 150.0)], &p);
        let once = split_polygons(vec![square(1, 100.0, &p)], &[cut], &p, 0.05);
        let twice = split_polygons(once.clone(), &[cut], &p, 0.05);
        assert_eq!(twice.len(), once.len());
    }

    #[test]
    fn test_invalid_gap_keeps_everything() {
        let p = MetricProjection::web_mercator();
        let cut = plane_cut([(50.0, -50.0), (50.0, 50.0), (50.0, 150.0)], &p);
        let polygons = vec![square(1, 100.0, &p)];
        let out = split_polygons(polygons.clone(), &[cut], &p, 0.0);
        assert_eq!(out, polygons);
    }

    #[test]
    fn test_bent_corridor_is_split_at_turn() {
        let p = MetricProjection::local(52.0);
        let seg = RailSegment::from_lon_lat(3, &[(9.99, 51.99), (10.0, 52.0), (10.01, 51.99)]);
        let corridor = buffer_segment(&seg, 50.0, &p).unwrap();
        let before = total_area(std::slice::from_ref(&corridor), &p);

        let cuts = generate_cut_lines(std::slice::from_ref(&corridor), &p, &CoverageConfig::default()).unwrap();
        let out = split_polygons(vec![corridor], &cuts, &p, 0.05);

        assert!(out.len() >= 2, "expected pieces, got {}", out.len());
        assert!(out.iter().all(|c| c.id == PolygonId::Segment(3)));
        let after = total_area(&out, &p);
        assert!(before - after < 50.0 && after <= before + 1.0);
    }
}
