//! Coverage for a country split into subdivisions, processed on a worker pool.
//!
//! Run with: cargo run --example country_coverage --features parallel <data-dir> <COUNTRY> [SUB ...]
//!
//! `<data-dir>` holds one Overpass response per region (`<CODE>.json`) and,
//! optionally, a boundary per region (`<CODE>.geojson`). Without subdivisions the
//! country itself is processed.

use rail_coverage::{
    boundary_from_geojson, default_worker_count, run_country, write_geojson, BoundaryProvider, CountryJob,
    CoverageConfig, CoverageError, RailSource, RailTopology, RailwayTagFilter, Result,
};
use geo::MultiPolygon;
use std::path::PathBuf;
use std::time::Instant;

/// Reads `<CODE>.json` and `<CODE>.geojson` from a directory.
struct DirectorySource {
    dir: PathBuf,
}

impl DirectorySource {
    fn source_error(region: &str, reason: impl ToString) -> CoverageError {
        CoverageError::Source {
            region: region.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl RailSource for DirectorySource {
    fn rail_topology(&self, region: &str) -> Result<RailTopology> {
        let path = self.dir.join(format!("{}.json", region));
        let file = std::fs::File::open(&path).map_err(|e| Self::source_error(region, e))?;
        RailTopology::from_reader(file)
    }
}

impl BoundaryProvider for DirectorySource {
    fn boundary(&self, region: &str) -> Result<Option<MultiPolygon<f64>>> {
        let path = self.dir.join(format!("{}.geojson", region));
        if !path.exists() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(&path).map_err(|e| Self::source_error(region, e))?;
        let doc = text
            .parse::<geojson::GeoJson>()
            .map_err(|e| Self::source_error(region, e))?;
        Ok(boundary_from_geojson(&doc))
    }
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    println!("Country Coverage Example\n");

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        eprintln!("usage: country_coverage <data-dir> <COUNTRY> [SUBDIVISION ...]");
        std::process::exit(2);
    }

    let source = DirectorySource { dir: PathBuf::from(&args[1]) };
    let job = CountryJob::new(args[2].as_str()).with_subdivisions(args[3..].iter().cloned());
    println!("Regions: {:?}", job.regions());
    println!("Workers: {}\n", default_worker_count());

    let start = Instant::now();
    let coverage = run_country(&job, &source, &source, &RailwayTagFilter::default(), &CoverageConfig::default())?;

    println!("Polygons:   {}", coverage.report.len());
    println!("Total area: {:.3} km²", coverage.report.total_area_m2 / 1e6);
    println!("Failed:     {:?}", coverage.failed_regions());
    println!("Time:       {:?}", start.elapsed());

    let out = format!("{}.geojson", job.country.to_lowercase());
    write_geojson(&coverage.report, std::fs::File::create(&out)?)?;
    println!("\nWrote {}", out);
    Ok(())
}
