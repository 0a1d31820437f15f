//! # Rail Topology
//!
//! OSM ways with their node table, as returned by an Overpass `out body; >; out skel qt;`
//! query. Ways reference nodes by id; [`RailTopology::segments`] resolves them into
//! [`RailSegment`] centerlines.

use std::collections::HashMap;
use std::io::Read;

use geo::Coord;
use log::{info, warn};
use serde::Deserialize;

use crate::{CoverageError, RailSegment, RailwayFilter, Result};

/// One OSM way.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Way {
    pub id: i64,
    /// Ordered node ids
    #[serde(default)]
    pub nodes: Vec<i64>,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

impl Way {
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }
}

/// Element of an Overpass JSON response
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum Element {
    Node { id: i64, lat: f64, lon: f64 },
    Way(Way),
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<Element>,
}

/// Ways plus the node id → `(lon, lat)` table they reference.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RailTopology {
    pub ways: Vec<Way>,
    pub nodes: HashMap<i64, Coord<f64>>,
}

impl RailTopology {
    /// Parse an Overpass JSON response. Elements other than nodes and ways are ignored.
    ///
    /// # Example
    /// ```
    /// use rail_coverage::RailTopology;
    ///
    /// let topo = RailTopology::from_overpass_json(r#"{"elements": [
    ///     {"type": "way", "id": 10, "nodes": [1, 2], "tags": {"railway": "rail"}},
    ///     {"type": "node", "id": 1, "lat": 52.0, "lon": 13.0},
    ///     {"type": "node", "id": 2, "lat": 52.0, "lon": 13.01}
    /// ]}"#).unwrap();
    /// assert_eq!(topo.ways.len(), 1);
    /// assert_eq!(topo.nodes.len(), 2);
    /// ```
    pub fn from_overpass_json(text: &str) -> Result<Self> {
        let response: OverpassResponse = serde_json::from_str(text)?;
        Ok(Self::from_elements(response.elements))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let response: OverpassResponse = serde_json::from_reader(reader)?;
        Ok(Self::from_elements(response.elements))
    }

    fn from_elements(elements: Vec<Element>) -> Self {
        let mut topology = Self::default();
        for element in elements {
            match element {
                Element::Node { id, lat, lon } => {
                    topology.nodes.insert(id, Coord { x: lon, y: lat });
                }
                Element::Way(way) => topology.ways.push(way),
                Element::Other => {}
            }
        }
        topology
    }

    /// Resolve one way's node ids into a centerline.
    pub fn resolve(&self, way: &Way) -> Result<RailSegment> {
        let coords = way
            .nodes
            .iter()
            .map(|node| {
                self.nodes
                    .get(node)
                    .copied()
                    .ok_or(CoverageError::MissingNode { way: way.id, node: *node })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(RailSegment::new(way.id, coords))
    }

    /// Centerlines of all ways accepted by `filter`, in input order.
    ///
    /// Ways referencing unknown nodes are logged and skipped.
    pub fn segments(&self, filter: &dyn RailwayFilter) -> Vec<RailSegment> {
        let mut rejected = 0usize;
        let mut segments = Vec::new();
        for way in &self.ways {
            if !filter.accepts(way) {
                rejected += 1;
                continue;
            }
            match self.resolve(way) {
                Ok(segment) => segments.push(segment),
                Err(e) => warn!("[Topology] Skipping way: {}", e),
            }
        }

        info!(
            "[Topology] {} of {} ways qualify ({} filtered by tags)",
            segments.len(),
            self.ways.len(),
            rejected
        );
        segments
    }
}

/// Overpass QL fetching the running lines of an ISO 3166 area with their nodes.
///
/// `is_country` selects ISO3166-1 (country code) instead of ISO3166-2 (subdivision).
pub fn overpass_query(area_code: &str, is_country: bool) -> String {
    let level = if is_country { 1 } else { 2 };
    format!(
        "[out:json];\n\
         area[\"ISO3166-{level}\"=\"{area_code}\"]->.searchArea;\n\
         (\n\
         way[\"railway\"=\"rail\"](area.searchArea);\n\
         way[\"railway\"=\"narrow_gauge\"](area.searchArea);\n\
         way[\"railway\"=\"preserved\"](area.searchArea);\n\
         );\n\
         out body;\n\
         >;\n\
         out skel qt;\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AcceptAll, RailwayTagFilter};

    const RESPONSE: &str = r#"{
        "version": 0.6,
        "elements": [
            {"type": "way", "id": 100, "nodes": [1, 2, 3], "tags": {"railway": "rail"}},
            {"type": "way", "id": 101, "nodes": [3, 4], "tags": {"railway": "rail", "service": "siding"}},
            {"type": "way", "id": 102, "nodes": [3, 99], "tags": {"railway": "rail"}},
            {"type": "relation", "id": 7, "members": []},
            {"type": "node", "id": 1, "lat": 52.0, "lon": 13.0},
            {"type": "node", "id": 2, "lat": 52.0, "lon": 13.01},
            {"type": "node", "id": 3, "lat": 52.01, "lon": 13.02},
            {"type": "node", "id": 4, "lat": 52.02, "lon": 13.02}
        ]
    }"#;

    #[test]
    fn test_parse_overpass_response() {
        let topo = RailTopology::from_overpass_json(RESPONSE).unwrap();
        assert_eq!(topo.ways.len(), 3);
        assert_eq!(topo.nodes.len(), 4);
        assert_eq!(topo.nodes[&2], Coord { x: 13.01, y: 52.0 });
        assert_eq!(topo.ways[1].tag("service"), Some("siding"));
    }

    #[test]
    fn test_from_reader_matches_from_str() {
        let a = RailTopology::from_overpass_json(RESPONSE).unwrap();
        let b = RailTopology::from_reader(RESPONSE.as_bytes()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_segments_filter_and_skip_missing_nodes() {
        let topo = RailTopology::from_overpass_json(RESPONSE).unwrap();

        let segments = topo.segments(&RailwayTagFilter::default());
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].id, 100);
        assert_eq!(segments[0].coords.len(), 3);

        // Siding passes without tag rules; way 102 still lacks node 99
        let all: Vec<i64> = topo.segments(&AcceptAll).iter().map(|s| s.id).collect();
        assert_eq!(all, vec![100, 101]);
    }

    #[test]
    fn test_missing_node_error() {
        let topo = RailTopology::from_overpass_json(RESPONSE).unwrap();
        let err = topo.resolve(&topo.ways[2]).unwrap_err();
        assert!(matches!(err, CoverageError::MissingNode { way: 102, node: 99 }));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            RailTopology::from_overpass_json("{not json").unwrap_err(),
            CoverageError::Json(_)
        ));
    }

    #[test]
    fn test_overpass_query() {
        let q = overpass_query("DE-BY", false);
        assert!(q.contains("area[\"ISO3166-2\"=\"DE-BY\"]"));
        assert!(q.contains("out skel qt;"));
        assert!(overpass_query("DE", true).contains("ISO3166-1"));
    }
}
