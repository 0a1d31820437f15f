//! # Overlap Clusterer
//!
//! Groups polygons into connected components of significant overlap and merges
//! each component into one polygon.
//!
//! ## Algorithm
//! 1. Project and repair every polygon, record its planar area and envelope
//! 2. Bulk-load an R-tree of envelopes to prune candidate pairs
//! 3. BFS from each unvisited polygon in index order; a neighbor joins when the two
//!    intersect and the intersection area passes [`OverlapThreshold::is_significant`]
//! 4. Singletons keep their geometry, larger components become the union of members
//!
//! Graph nodes are plain indices into the input slice (`visited` flags plus a queue),
//! so the result depends only on input order and threshold. Envelope pruning never
//! drops a pair that could intersect, so components equal the naive all-pairs result.
//!
//! The pipeline calls this twice: a permissive pre-merge that fuses duplicated
//! corridors before cutting, and a strict post-cut pass that only reassembles
//! fragments sharing a non-trivial area.

use geo::{unary_union, Area, BooleanOps, BoundingRect, Intersects, MultiPolygon};
use log::{debug, info};
use rstar::{RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::{CoveragePolygon, MetricProjection, PolygonId, Result};

/// When an overlap between two polygons is large enough to connect them.
///
/// Either condition suffices. A `None` field disables that condition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverlapThreshold {
    /// Connect when the intersection area exceeds this (m²)
    pub max_area_m2: Option<f64>,
    /// Connect when the intersection exceeds this fraction of the smaller polygon
    pub max_fraction: Option<f64>,
}

impl OverlapThreshold {
    /// Absolute-area test only.
    pub fn area(max_area_m2: f64) -> Self {
        Self { max_area_m2: Some(max_area_m2), max_fraction: None }
    }

    /// Fraction-of-smaller-polygon test only.
    pub fn fraction(max_fraction: f64) -> Self {
        Self { max_area_m2: None, max_fraction: Some(max_fraction) }
    }

    /// Add an absolute-area condition.
    pub fn or_area(self, max_area_m2: f64) -> Self {
        Self { max_area_m2: Some(max_area_m2), ..self }
    }

    /// Permissive pass before cutting: half the smaller polygon, or half a hectare.
    pub fn pre_merge() -> Self {
        Self::fraction(0.5).or_area(5_000.0)
    }

    /// Cleanup pass after cutting: anything beyond floating-point slivers.
    pub fn post_merge() -> Self {
        Self::area(0.01)
    }

    pub fn is_significant(&self, overlap_m2: f64, area_a_m2: f64, area_b_m2: f64) -> bool {
        let by_area = self.max_area_m2.is_some_and(|t| overlap_m2 > t);
        let by_fraction = self
            .max_fraction
            .is_some_and(|f| overlap_m2 > area_a_m2.min(area_b_m2) * f);
        by_area || by_fraction
    }
}

impl Default for OverlapThreshold {
    fn default() -> Self {
        Self::pre_merge()
    }
}

/// One connected component of significantly overlapping polygons.
#[derive(Debug, Clone)]
pub struct OverlapCluster {
    /// Component number, in discovery order
    pub id: u32,
    /// Indices into the clustered slice, ascending
    pub indices: Vec<usize>,
    /// Owners of the member polygons
    pub members: Vec<PolygonId>,
    /// Union of member geometries (WGS84)
    pub geometry: MultiPolygon<f64>,
}

/// Envelope of one polygon for R-tree pruning
#[derive(Debug, Clone)]
struct IndexedEnvelope {
    idx: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Planar, repaired view of an input polygon
struct Prepared {
    planar: MultiPolygon<f64>,
    area: f64,
    envelope: Option<AABB<[f64; 2]>>,
}

/// Find connected components of significant overlap.
pub fn find_clusters(
    polygons: &[CoveragePolygon],
    threshold: &OverlapThreshold,
    projection: &MetricProjection,
) -> Result<Vec<OverlapCluster>> {
    let n = polygons.len();
    let prepared: Vec<Prepared> = polygons
        .iter()
        .map(|p| prepare(&p.geometry, projection))
        .collect::<Result<_>>()?;

    let entries: Vec<IndexedEnvelope> = prepared
        .iter()
        .enumerate()
        .filter_map(|(idx, p)| p.envelope.map(|envelope| IndexedEnvelope { idx, envelope }))
        .collect();
    let rtree = RTree::bulk_load(entries);

    let mut visited = vec![false; n];
    let mut clusters = Vec::new();
    let mut pair_tests = 0usize;

    for start in 0..n {
        if visited[start] {
            continue;
        }
        visited[start] = true;
        let mut indices = vec![start];
        let mut queue = VecDeque::from([start]);

        while let Some(current) = queue.pop_front() {
            let Some(envelope) = prepared[current].envelope else {
                continue;
            };
            let mut candidates: Vec<usize> = rtree
                .locate_in_envelope_intersecting(&envelope)
                .map(|e| e.idx)
                .filter(|&j| !visited[j])
                .collect();
            candidates.sort_unstable();

            for j in candidates {
                pair_tests += 1;
                if significant_overlap(&prepared[current], &prepared[j], threshold) {
                    visited[j] = true;
                    indices.push(j);
                    queue.push_back(j);
                }
            }
        }

        indices.sort_unstable();
        let geometry = if indices.len() == 1 {
            polygons[start].geometry.clone()
        } else {
            unary_union(indices.iter().map(|&i| &polygons[i].geometry))
        };
        clusters.push(OverlapCluster {
            id: clusters.len() as u32,
            members: indices.iter().map(|&i| polygons[i].id).collect(),
            indices,
            geometry,
        });
    }

    debug!("[Cluster] {} candidate pairs tested for {} polygons", pair_tests, n);
    Ok(clusters)
}

/// Merge each connected component into one polygon with a fresh cluster id.
///
/// # Example
/// ```
/// use rail_coverage::{buffer_segment, merge_overlapping, MetricProjection, OverlapThreshold, RailSegment};
///
/// let p = MetricProjection::web_mercator();
/// let a = buffer_segment(&RailSegment::from_lon_lat(1, &[(0.0, 0.0), (0.01, 0.0)]), 50.0, &p).unwrap();
/// let b = buffer_segment(&RailSegment::from_lon_lat(2, &[(0.0, 0.0), (0.01, 0.0)]), 50.0, &p).unwrap();
///
/// let merged = merge_overlapping(&[a, b], &OverlapThreshold::fraction(0.5), &p).unwrap();
/// assert_eq!(merged.len(), 1);
/// ```
pub fn merge_overlapping(
    polygons: &[CoveragePolygon],
    threshold: &OverlapThreshold,
    projection: &MetricProjection,
) -> Result<Vec<CoveragePolygon>> {
    let clusters = find_clusters(polygons, threshold, projection)?;
    info!(
        "[Cluster] Merged {} polygons into {} clusters",
        polygons.len(),
        clusters.len()
    );

    Ok(clusters
        .into_iter()
        .map(|c| CoveragePolygon::new(PolygonId::Cluster(c.id), c.geometry))
        .collect())
}

fn prepare(geometry: &MultiPolygon<f64>, projection: &MetricProjection) -> Result<Prepared> {
    let planar = repair(&projection.project(geometry)?);
    let area = planar.unsigned_area();
    let envelope = planar
        .bounding_rect()
        .map(|r| AABB::from_corners([r.min().x, r.min().y], [r.max().x, r.max().y]));
    Ok(Prepared { planar, area, envelope })
}

/// Self-union, equivalent to a zero-width buffer. Resolves self-intersections and
/// overlapping parts.
pub(crate) fn repair(geometry: &MultiPolygon<f64>) -> MultiPolygon<f64> {
    unary_union(std::iter::once(geometry))
}

fn significant_overlap(a: &Prepared, b: &Prepared, threshold: &OverlapThreshold) -> bool {
    if !a.planar.intersects(&b.planar) {
        return false;
    }
    let overlap = a.planar.intersection(&b.planar).unsigned_area();
    threshold.is_significant(overlap, a.area, b.area)
}
