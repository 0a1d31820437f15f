//! Coverage for a single region.
//!
//! Run with: cargo run --example region_coverage [overpass.json] [boundary.geojson]
//!
//! Without arguments a small synthetic junction is used. Logging is controlled with
//! `RUST_LOG`, e.g. `RUST_LOG=debug`.

use rail_coverage::{
    boundary_from_geojson, process_region, to_geojson_string, CoverageConfig, RailSegment, RailTopology,
    RailwayTagFilter,
};
use std::error::Error;
use std::time::Instant;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    println!("Region Coverage Example\n");

    let args: Vec<String> = std::env::args().collect();

    let segments = match args.get(1) {
        Some(path) => {
            let topology = RailTopology::from_reader(std::fs::File::open(path)?)?;
            topology.segments(&RailwayTagFilter::default())
        }
        None => synthetic_junction(),
    };
    println!("Segments: {}", segments.len());

    let boundary = match args.get(2) {
        Some(path) => boundary_from_geojson(&std::fs::read_to_string(path)?.parse::<geojson::GeoJson>()?),
        None => None,
    };

    let config = CoverageConfig::default();
    let start = Instant::now();
    let coverage = process_region("DEMO", &segments, boundary.as_ref(), &config)?;
    let elapsed = start.elapsed();

    println!("Polygons:   {}", coverage.report.len());
    println!("Total area: {:.3} km²", coverage.report.total_area_m2 / 1e6);
    println!("Time:       {:?}\n", elapsed);

    for (i, polygon) in coverage.report.polygons.iter().enumerate() {
        println!(
            "  {:>3}  {:<14} {:>12.0} m²",
            i,
            polygon.id.to_string(),
            polygon.area_m2.unwrap_or(0.0)
        );
    }

    let out = "region_coverage.geojson";
    std::fs::write(out, to_geojson_string(&coverage.report)?)?;
    println!("\nWrote {}", out);
    Ok(())
}

/// A main line with a branch diverging at a shallow angle, plus a parallel track.
fn synthetic_junction() -> Vec<RailSegment> {
    vec![
        RailSegment::from_lon_lat(1, &[(13.30, 52.50), (13.35, 52.50), (13.40, 52.50)]),
        RailSegment::from_lon_lat(2, &[(13.30, 52.5004), (13.35, 52.5004), (13.40, 52.5004)]),
        RailSegment::from_lon_lat(3, &[(13.35, 52.50), (13.37, 52.505), (13.40, 52.515)]),
    ]
}
