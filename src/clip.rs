//! Boundary clipping and boundary loading.

use geo::{BooleanOps, BoundingRect, Contains, CoordsIter, Intersects, MultiPolygon, Polygon};
use geojson::{GeoJson, Value};
use log::{info, warn};

use crate::{CoverageError, CoveragePolygon, Result};

/// Intersect every polygon with `boundary`, dropping those left empty.
///
/// `None` passes the polygons through unchanged. Polygons entirely inside the
/// boundary are kept as they are. Clipping happens in WGS84.
pub fn clip_to_boundary(
    region: &str,
    polygons: Vec<CoveragePolygon>,
    boundary: Option<&MultiPolygon<f64>>,
) -> Result<Vec<CoveragePolygon>> {
    let Some(boundary) = boundary else {
        return Ok(polygons);
    };
    validate_boundary(region, boundary)?;
    let Some(boundary_rect) = boundary.bounding_rect() else {
        info!("[Clip] {}: boundary is empty, no coverage remains", region);
        return Ok(vec![]);
    };

    let before = polygons.len();
    let mut clipped = Vec::with_capacity(before);
    for mut polygon in polygons {
        let inside_rect = polygon
            .geometry
            .bounding_rect()
            .is_some_and(|r| r.intersects(&boundary_rect));
        if !inside_rect {
            continue;
        }
        if !boundary.contains(&polygon.geometry) {
            polygon.geometry = polygon.geometry.intersection(boundary);
            polygon.area_m2 = None;
        }
        if !polygon.is_empty() {
            clipped.push(polygon);
        }
    }

    if clipped.is_empty() && before > 0 {
        info!("[Clip] {}: no coverage inside the boundary", region);
    } else {
        info!("[Clip] {}: kept {} of {} polygons", region, clipped.len(), before);
    }
    Ok(clipped)
}

fn validate_boundary(region: &str, boundary: &MultiPolygon<f64>) -> Result<()> {
    if let Some(c) = boundary.coords_iter().find(|c| !(c.x.is_finite() && c.y.is_finite())) {
        return Err(CoverageError::MalformedBoundary {
            region: region.to_string(),
            reason: format!("non-finite coordinate ({}, {})", c.x, c.y),
        });
    }
    Ok(())
}

/// Collect every Polygon and MultiPolygon geometry of a GeoJSON document into one
/// boundary. Other geometry types are ignored; no areal geometry gives `None`.
///
/// # Example
/// ```
/// use geojson::GeoJson;
/// use rail_coverage::boundary_from_geojson;
///
/// let doc: GeoJson = r#"{"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,1],[0,0]]]}"#
///     .parse()
///     .unwrap();
/// assert_eq!(boundary_from_geojson(&doc).unwrap().0.len(), 1);
/// ```
pub fn boundary_from_geojson(doc: &GeoJson) -> Option<MultiPolygon<f64>> {
    let values: Vec<&Value> = match doc {
        GeoJson::Geometry(g) => vec![&g.value],
        GeoJson::Feature(f) => f.geometry.iter().map(|g| &g.value).collect(),
        GeoJson::FeatureCollection(fc) => fc
            .features
            .iter()
            .filter_map(|f| f.geometry.as_ref())
            .map(|g| &g.value)
            .collect(),
    };

    let mut parts: Vec<Polygon<f64>> = Vec::new();
    for value in values {
        match value {
            Value::Polygon(_) => match Polygon::<f64>::try_from(value.clone()) {
                Ok(p) => parts.push(p),
                Err(e) => warn!("[Clip] Ignoring boundary polygon: {}", e),
            },
            Value::MultiPolygon(_) => match MultiPolygon::<f64>::try_from(value.clone()) {
                Ok(mp) => parts.extend(mp.0),
                Err(e) => warn!("[Clip] Ignoring boundary multipolygon: {}", e),
            },
            _ => {}
        }
    }

    (!parts.is_empty()).then(|| MultiPolygon::new(parts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PolygonId;
    use geo::{polygon, Area};

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![polygon![
            (x: x0, y: y0),
            (x: x1, y: y0),
            (x: x1, y: y1),
            (x: x0, y: y1),
            (x: x0, y: y0),
        ]])
    }

    fn coverage(id: i64, geometry: MultiPolygon<f64>) -> CoveragePolygon {
        CoveragePolygon::new(PolygonId::Segment(id), geometry)
    }

    #[test]
    fn test_no_boundary_passes_through() {
        let polygons = vec![coverage(1, rect(0.0, 0.0, 1.0, 1.0))];
        let out = clip_to_boundary("XX", polygons.clone(), None).unwrap();
        assert_eq!(out, polygons);
    }

    #[test]
    fn test_partial_overlap_is_intersected() {
        let boundary = rect(0.0, 0.0, 1.0, 1.0);
        let polygons = vec![coverage(1, rect(0.5, 0.0, 1.5, 1.0))];
        let out = clip_to_boundary("XX", polygons, Some(&boundary)).unwrap();
        assert_eq!(out.len(), 1);
        assert!((out[0].geometry.unsigned_area() - 0.5).abs() < 1e-9);
        assert_eq!(out[0].id, PolygonId::Segment(1));
    }

    #[test]
    fn test_inside_polygon_is_untouched() {
        let boundary = rect(0.0, 0.0, 1.0, 1.0);
        let inner = coverage(1, rect(0.2, 0.2, 0.4, 0.4));
        let out = clip_to_boundary("XX", vec![inner.clone()], Some(&boundary)).unwrap();
        assert_eq!(out, vec![inner]);
    }

    #[test]
    fn test_outside_polygons_are_dropped() {
        let boundary = rect(0.0, 0.0, 1.0, 1.0);
        let polygons = vec![coverage(1, rect(2.0, 2.0, 3.0, 3.0)), coverage(2, rect(1.0, 0.0, 2.0, 1.0))];
        let out = clip_to_boundary("XX", polygons, Some(&boundary)).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_non_finite_boundary_is_malformed() {
        let boundary = rect(0.0, 0.0, f64::NAN, 1.0);
        let err = clip_to_boundary("XX-1", vec![], Some(&boundary)).unwrap_err();
        assert!(matches!(err, CoverageError::MalformedBoundary { ref region, .. } if region == "XX-1"));
    }

    #[test]
    fn test_boundary_from_feature_collection() {
        let doc: GeoJson = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {},
                 "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,1],[0,0]]]}},
                {"type": "Feature", "properties": {},
                 "geometry": {"type": "MultiPolygon", "coordinates": [
                    [[[2,2],[3,2],[3,3],[2,3],[2,2]]],
                    [[[4,4],[5,4],[5,5],[4,5],[4,4]]]
                 ]}},
                {"type": "Feature", "properties": {},
                 "geometry": {"type": "Point", "coordinates": [9, 9]}}
            ]
        }"#
        .parse()
        .unwrap();
        let boundary = boundary_from_geojson(&doc).unwrap();
        assert_eq!(boundary.0.len(), 3);
    }

    #[test]
    fn test_boundary_without_areas_is_none() {
        let doc: GeoJson = r#"{"type": "FeatureCollection", "features": []}"#.parse().unwrap();
        assert!(boundary_from_geojson(&doc).is_none());
    }
}
