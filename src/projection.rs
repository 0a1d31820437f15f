//! # Metric Projection
//!
//! Conformal WGS84 ⇄ planar mapping used by every metric step of a pipeline run.
//!
//! All buffering, corner analysis, overlap tests and area sums happen on the plane
//! produced by one [`MetricProjection`] value. The value is created once per run and
//! passed explicitly to each stage, so the areas summed at the end are coherent with
//! the per-polygon areas.
//!
//! ## Kinds
//!
//! | Kind | Plane | Unit |
//! |------|-------|------|
//! | [`ProjectionKind::WebMercator`] | EPSG:3857 | meter at the equator |
//! | [`ProjectionKind::LocalMercator`] | spherical Mercator scaled by `cos(φ₀)` | ground meter at `φ₀` |
//!
//! Both are Mercator, so angles are preserved and corner detection behaves the same.
//! Web Mercator inflates lengths by `1 / cos(φ)`; the local variant cancels that at the
//! reference latitude, which keeps buffer widths and areas close to ground truth for a
//! region a few hundred kilometers tall.

use geo::{Coord, MapCoords};
use serde::{Deserialize, Serialize};

use crate::{Bounds, CoverageError, Result};

/// WGS84 semi-major axis used by spherical Mercator
pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// Which metric plane a pipeline run works in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectionKind {
    /// Plain EPSG:3857.
    WebMercator,
    /// Mercator rescaled to true scale at the region's mid-latitude.
    #[default]
    LocalMercator,
}

/// A concrete projection for one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricProjection {
    kind: ProjectionKind,
    reference_lat: f64,
    scale: f64,
}

impl MetricProjection {
    /// EPSG:3857 Web Mercator.
    pub fn web_mercator() -> Self {
        Self {
            kind: ProjectionKind::WebMercator,
            reference_lat: 0.0,
            scale: 1.0,
        }
    }

    /// Mercator with true scale at `reference_lat` (degrees).
    pub fn local(reference_lat: f64) -> Self {
        let lat = reference_lat.clamp(-85.0, 85.0);
        Self {
            kind: ProjectionKind::LocalMercator,
            reference_lat: lat,
            scale: lat.to_radians().cos(),
        }
    }

    /// Pick the projection of `kind` suited to data inside `bounds`.
    pub fn for_bounds(kind: ProjectionKind, bounds: &Bounds) -> Self {
        match kind {
            ProjectionKind::WebMercator => Self::web_mercator(),
            ProjectionKind::LocalMercator => Self::local(bounds.center().y),
        }
    }

    pub fn kind(&self) -> ProjectionKind {
        self.kind
    }

    /// Latitude (degrees) at which one plane unit equals one ground meter.
    pub fn reference_lat(&self) -> f64 {
        self.reference_lat
    }

    /// Project a `(lon, lat)` coordinate onto the plane.
    pub fn forward(&self, c: Coord<f64>) -> Result<Coord<f64>> {
        let r = EARTH_RADIUS * self.scale;
        let x = r * c.x.to_radians();
        let y = r * (std::f64::consts::FRAC_PI_4 + c.y.to_radians() / 2.0).tan().ln();
        finite(x, y)
    }

    /// Map a plane coordinate back to `(lon, lat)`.
    pub fn inverse(&self, c: Coord<f64>) -> Result<Coord<f64>> {
        let r = EARTH_RADIUS * self.scale;
        let lon = (c.x / r).to_degrees();
        let lat = (2.0 * (c.y / r).exp().atan() - std::f64::consts::FRAC_PI_2).to_degrees();
        finite(lon, lat)
    }

    /// Project any geometry onto the plane.
    pub fn project<G>(&self, geometry: &G) -> Result<G>
    where
        G: MapCoords<f64, f64, Output = G>,
    {
        geometry.try_map_coords(|c| self.forward(c))
    }

    /// Map any planar geometry back to WGS84.
    pub fn unproject<G>(&self, geometry: &G) -> Result<G>
    where
        G: MapCoords<f64, f64, Output = G>,
    {
        geometry.try_map_coords(|c| self.inverse(c))
    }
}

impl Default for MetricProjection {
    fn default() -> Self {
        Self::web_mercator()
    }
}

#[inline]
fn finite(x: f64, y: f64) -> Result<Coord<f64>> {
    if x.is_finite() && y.is_finite() {
        Ok(Coord { x, y })
    } else {
        Err(CoverageError::ProjectionFailure { x, y })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{coord, LineString};

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    #[test]
    fn test_web_mercator_known_value() {
        let p = MetricProjection::web_mercator();
        let c = p.forward(coord! { x: 180.0, y: 0.0 }).unwrap();
        assert!(approx_eq(c.x, 20_037_508.342789244, 1e-6));
        assert!(approx_eq(c.y, 0.0, 1e-6));
    }

    #[test]
    fn test_round_trip() {
        let p = MetricProjection::local(52.5);
        let original = coord! { x: 13.4, y: 52.52 };
        let back = p.inverse(p.forward(original).unwrap()).unwrap();
        assert!(approx_eq(back.x, original.x, 1e-9));
        assert!(approx_eq(back.y, original.y, 1e-9));
    }

    #[test]
    fn test_local_scale_is_ground_meters() {
        // 0.01 degrees of longitude at 60N is ~556 m on the ground
        let p = MetricProjection::local(60.0);
        let a = p.forward(coord! { x: 10.0, y: 60.0 }).unwrap();
        let b = p.forward(coord! { x: 10.01, y: 60.0 }).unwrap();
        assert!(approx_eq(b.x - a.x, 556.6, 1.0));

        // Web Mercator doubles that at 60N
        let wm = MetricProjection::web_mercator();
        let a = wm.forward(coord! { x: 10.0, y: 60.0 }).unwrap();
        let b = wm.forward(coord! { x: 10.01, y: 60.0 }).unwrap();
        assert!(approx_eq(b.x - a.x, 1113.2, 1.0));
    }

    #[test]
    fn test_non_finite_input_fails() {
        let p = MetricProjection::web_mercator();
        let err = p.forward(coord! { x: f64::NAN, y: 10.0 }).unwrap_err();
        assert!(matches!(err, CoverageError::ProjectionFailure { .. }));

        let line = LineString::from(vec![(0.0, 0.0), (f64::INFINITY, 1.0)]);
        assert!(p.project(&line).is_err());
    }

    #[test]
    fn test_for_bounds_uses_center_latitude() {
        let bounds = Bounds { min_lat: 40.0, max_lat: 50.0, min_lng: 0.0, max_lng: 1.0 };
        let p = MetricProjection::for_bounds(ProjectionKind::LocalMercator, &bounds);
        assert_eq!(p.kind(), ProjectionKind::LocalMercator);
        assert!(approx_eq(p.reference_lat(), 45.0, 1e-12));

        let wm = MetricProjection::for_bounds(ProjectionKind::WebMercator, &bounds);
        assert_eq!(wm, MetricProjection::web_mercator());
    }
}
