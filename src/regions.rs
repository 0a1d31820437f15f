//! # Country Runner
//!
//! Runs the region pipeline for every first-level subdivision of a country and
//! combines the results.
//!
//! Regions are independent: each one fetches its own rail topology and boundary,
//! and a failure (error or panic) in one region is logged and recorded as a
//! [`RegionOutcome::Failed`] without touching the others. With the `parallel`
//! feature regions run on a dedicated rayon pool; otherwise they run one by one.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};

use geo::{BoundingRect, MultiPolygon};
use log::{info, warn};

use crate::{
    clip_to_boundary, compute_areas, process_region, Bounds, CoverageConfig, CoverageError, CoverageReport,
    MetricProjection, RailTopology, RailwayFilter, RegionCoverage, Result,
};

// ============================================================================
// Sources
// ============================================================================

/// Supplies the railway ways and nodes of a region (ISO 3166 code).
pub trait RailSource: Send + Sync {
    fn rail_topology(&self, region: &str) -> Result<RailTopology>;
}

/// Supplies the boundary a region's coverage is clipped to.
///
/// `Ok(None)` means no boundary is known and clipping is skipped.
pub trait BoundaryProvider: Send + Sync {
    fn boundary(&self, region: &str) -> Result<Option<MultiPolygon<f64>>>;
}

/// Topologies held in memory, keyed by region code.
impl RailSource for HashMap<String, RailTopology> {
    fn rail_topology(&self, region: &str) -> Result<RailTopology> {
        self.get(region).cloned().ok_or_else(|| CoverageError::Source {
            region: region.to_string(),
            reason: "no rail data".to_string(),
        })
    }
}

/// Boundaries held in memory; unknown regions have no boundary.
impl BoundaryProvider for HashMap<String, MultiPolygon<f64>> {
    fn boundary(&self, region: &str) -> Result<Option<MultiPolygon<f64>>> {
        Ok(self.get(region).cloned())
    }
}

// ============================================================================
// Job & Outcomes
// ============================================================================

/// What to process: a country and optionally its subdivisions.
#[derive(Debug, Clone, PartialEq)]
pub struct CountryJob {
    /// ISO 3166-1 code
    pub country: String,
    /// ISO 3166-2 codes. Empty means the country is processed as a single region.
    pub subdivisions: Vec<String>,
    /// Worker threads; `None` uses [`default_worker_count`]
    pub workers: Option<usize>,
}

impl CountryJob {
    pub fn new(country: impl Into<String>) -> Self {
        Self {
            country: country.into(),
            subdivisions: vec![],
            workers: None,
        }
    }

    pub fn with_subdivisions<I, S>(mut self, subdivisions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subdivisions = subdivisions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers.max(1));
        self
    }

    /// Region codes to run, in order.
    pub fn regions(&self) -> Vec<String> {
        if self.subdivisions.is_empty() {
            vec![self.country.clone()]
        } else {
            self.subdivisions.clone()
        }
    }
}

/// Result of one region.
#[derive(Debug)]
pub enum RegionOutcome {
    Covered(RegionCoverage),
    Failed { region: String, error: CoverageError },
}

impl RegionOutcome {
    pub fn region(&self) -> &str {
        match self {
            RegionOutcome::Covered(c) => &c.region,
            RegionOutcome::Failed { region, .. } => region,
        }
    }
}

/// Combined coverage of a country.
#[derive(Debug)]
pub struct CountryCoverage {
    pub country: String,
    /// Per-region outcomes, in job order
    pub outcomes: Vec<RegionOutcome>,
    /// Projection the combined areas were measured in
    pub projection: MetricProjection,
    pub report: CoverageReport,
}

impl CountryCoverage {
    pub fn failed_regions(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, RegionOutcome::Failed { .. }))
            .map(RegionOutcome::region)
            .collect()
    }
}

// ============================================================================
// Runner
// ============================================================================

/// Half the cores minus one, at least one.
pub fn default_worker_count() -> usize {
    let cores = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
    ((cores as f64 * 0.5 - 1.0).floor() as usize).max(1)
}

/// Run every region of `job` and combine the covered ones.
///
/// When the job has subdivisions, the combined polygons are clipped to the country
/// boundary before they are measured. A country boundary that cannot be fetched
/// skips that clip, and a malformed one fails the run. Pool construction is the
/// only other run-level failure; region failures are recorded in the outcomes.
/// Combined areas are re-measured in one projection for the country.
pub fn run_country(
    job: &CountryJob,
    source: &dyn RailSource,
    boundaries: &dyn BoundaryProvider,
    filter: &dyn RailwayFilter,
    config: &CoverageConfig,
) -> Result<CountryCoverage> {
    let regions = job.regions();
    let workers = job.workers.unwrap_or_else(default_worker_count).min(regions.len()).max(1);
    info!(
        "[Regions] {}: {} regions on {} workers",
        job.country,
        regions.len(),
        workers
    );

    let run = |region: &String| run_region(region, source, boundaries, filter, config);

    #[cfg(feature = "parallel")]
    let outcomes: Vec<RegionOutcome> = {
        use rayon::prelude::*;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| CoverageError::WorkerPool(e.to_string()))?;
        pool.install(|| regions.par_iter().map(run).collect())
    };

    #[cfg(not(feature = "parallel"))]
    let outcomes: Vec<RegionOutcome> = regions.iter().map(run).collect();

    let polygons: Vec<_> = outcomes
        .iter()
        .filter_map(|o| match o {
            RegionOutcome::Covered(c) => Some(c.report.polygons.iter().cloned()),
            RegionOutcome::Failed { .. } => None,
        })
        .flatten()
        .collect();
    let polygons = if job.subdivisions.is_empty() {
        polygons
    } else {
        let boundary = boundaries.boundary(&job.country).unwrap_or_else(|e| {
            warn!("[Regions] {}: country boundary unavailable, not clipping: {}", job.country, e);
            None
        });
        clip_to_boundary(&job.country, polygons, boundary.as_ref())?
    };

    let projection = polygons
        .iter()
        .filter_map(|p| p.geometry.bounding_rect())
        .map(|r| Bounds {
            min_lat: r.min().y,
            max_lat: r.max().y,
            min_lng: r.min().x,
            max_lng: r.max().x,
        })
        .reduce(|a, b| a.union(&b))
        .map(|b| MetricProjection::for_bounds(config.projection, &b))
        .unwrap_or_else(MetricProjection::web_mercator);

    let report = compute_areas(polygons, &projection)?;
    let failed = outcomes
        .iter()
        .filter(|o| matches!(o, RegionOutcome::Failed { .. }))
        .count();
    info!(
        "[Regions] {}: {} polygons, {:.0} m² from {} regions ({} failed)",
        job.country,
        report.len(),
        report.total_area_m2,
        outcomes.len(),
        failed
    );

    Ok(CountryCoverage {
        country: job.country.clone(),
        outcomes,
        projection,
        report,
    })
}

fn run_region(
    region: &str,
    source: &dyn RailSource,
    boundaries: &dyn BoundaryProvider,
    filter: &dyn RailwayFilter,
    config: &CoverageConfig,
) -> RegionOutcome {
    let attempt = catch_unwind(AssertUnwindSafe(|| -> Result<RegionCoverage> {
        let topology = source.rail_topology(region)?;
        let segments = topology.segments(filter);
        let boundary = boundaries.boundary(region)?;
        process_region(region, &segments, boundary.as_ref(), config)
    }));

    let error = match attempt {
        Ok(Ok(coverage)) => return RegionOutcome::Covered(coverage),
        Ok(Err(e)) => e,
        Err(_) => CoverageError::RegionPanicked {
            region: region.to_string(),
        },
    };
    warn!("[Regions] no coverage data produced for region {}: {}", region, error);
    RegionOutcome::Failed {
        region: region.to_string(),
        error,
    }
}
