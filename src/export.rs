//! GeoJSON export of a [`CoverageReport`].
//!
//! One Feature per polygon with properties `id` (running index), `source` (owner id)
//! and `area_m2`. The collection carries `total_area_m2` as a foreign member.

use std::io::Write;

use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use serde_json::json;

use crate::{CoverageReport, Result};

pub fn to_feature_collection(report: &CoverageReport) -> FeatureCollection {
    let features = report
        .polygons
        .iter()
        .enumerate()
        .map(|(i, polygon)| {
            let mut properties = JsonObject::new();
            properties.insert("id".to_string(), json!(i));
            properties.insert("source".to_string(), json!(polygon.id.to_string()));
            properties.insert("area_m2".to_string(), json!(polygon.area_m2));
            Feature {
                bbox: None,
                geometry: Some(Geometry::new(Value::from(&polygon.geometry))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    let mut foreign_members = JsonObject::new();
    foreign_members.insert("total_area_m2".to_string(), json!(report.total_area_m2));

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: Some(foreign_members),
    }
}

pub fn to_geojson_string(report: &CoverageReport) -> Result<String> {
    Ok(serde_json::to_string(&to_feature_collection(report))?)
}

/// Stream the collection to `writer`.
pub fn write_geojson<W: Write>(report: &CoverageReport, writer: W) -> Result<()> {
    serde_json::to_writer(writer, &to_feature_collection(report))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CoveragePolygon, PolygonId};
    use geo::{polygon, MultiPolygon};
    use geojson::GeoJson;

    fn report() -> CoverageReport {
        let square = MultiPolygon::new(vec![polygon![
            (x: 13.0, y: 52.0),
            (x: 13.1, y: 52.0),
            (x: 13.1, y: 52.1),
            (x: 13.0, y: 52.1),
        ]]);
        let mut a = CoveragePolygon::new(PolygonId::Segment(42), square.clone());
        a.area_m2 = Some(1000.0);
        let mut b = CoveragePolygon::new(PolygonId::Cluster(3), square);
        b.area_m2 = Some(500.0);
        CoverageReport { polygons: vec![a, b], total_area_m2: 1500.0 }
    }

    #[test]
    fn test_feature_properties() {
        let fc = to_feature_collection(&report());
        assert_eq!(fc.features.len(), 2);

        let props = fc.features[1].properties.as_ref().unwrap();
        assert_eq!(props["id"], json!(1));
        assert_eq!(props["source"], json!("cluster/3"));
        assert_eq!(props["area_m2"], json!(500.0));

        let total = &fc.foreign_members.as_ref().unwrap()["total_area_m2"];
        assert_eq!(total, &json!(1500.0));
    }

    #[test]
    fn test_string_output_parses_back() {
        let text = to_geojson_string(&report()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["type"], "FeatureCollection");
        assert_eq!(parsed["total_area_m2"], json!(1500.0));

        // MultiPolygon -> polygon -> ring -> position, [lon, lat], closed rings
        let ring = &parsed["features"][0]["geometry"]["coordinates"][0][0];
        let ring = ring.as_array().unwrap();
        assert_eq!(ring[0], json!([13.0, 52.0]));
        assert_eq!(ring.first(), ring.last());

        assert!(matches!(text.parse::<GeoJson>().unwrap(), GeoJson::FeatureCollection(_)));
    }

    #[test]
    fn test_write_geojson() {
        let mut buf = Vec::new();
        write_geojson(&report(), &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), to_geojson_string(&report()).unwrap());
    }
}
