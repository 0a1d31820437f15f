//! Area computation and the final coverage report.

use geo::{Area, BoundingRect, Contains, Intersects, Point};
use log::info;

use crate::cluster::repair;
use crate::{CoveragePolygon, MetricProjection, Result};

/// Final polygons, each with `area_m2` set, plus their sum.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageReport {
    pub polygons: Vec<CoveragePolygon>,
    /// Sum of all polygon areas in square meters
    pub total_area_m2: f64,
}

impl CoverageReport {
    pub fn len(&self) -> usize {
        self.polygons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    /// Find the polygon covering `(lon, lat)`, with its index (the exported feature id).
    ///
    /// Returns the first match in output order.
    pub fn feature_at(&self, lon: f64, lat: f64) -> Option<(usize, &CoveragePolygon)> {
        let point = Point::new(lon, lat);
        self.polygons.iter().enumerate().find(|(_, p)| {
            p.geometry.bounding_rect().is_some_and(|r| r.intersects(&point)) && p.geometry.contains(&point)
        })
    }
}

/// Attach `area_m2` to every polygon and sum them.
///
/// Every polygon is measured in the same projection, after self-union so that
/// overlapping parts are not counted twice.
pub fn compute_areas(polygons: Vec<CoveragePolygon>, projection: &MetricProjection) -> Result<CoverageReport> {
    let mut total_area_m2 = 0.0;
    let mut measured = Vec::with_capacity(polygons.len());
    for mut polygon in polygons {
        let area = repair(&projection.project(&polygon.geometry)?).unsigned_area();
        polygon.area_m2 = Some(area);
        total_area_m2 += area;
        measured.push(polygon);
    }

    info!(
        "[Area] {} polygons, total {:.0} m² ({:.3} km²)",
        measured.len(),
        total_area_m2,
        total_area_m2 / 1e6
    );
    Ok(CoverageReport { polygons: measured, total_area_m2 })
}
