//! Error types for the coverage pipeline.
//!
//! Errors fall into two groups. Per-item failures ([`CoverageError::DegenerateGeometry`],
//! [`CoverageError::MissingNode`], [`CoverageError::SplitFailure`]) are logged and the
//! item is skipped or kept as-is; they never abort a run. Everything else aborts the
//! pipeline run of the region it occurred in, and only that region.

use thiserror::Error;

/// Result type for coverage operations
pub type Result<T> = std::result::Result<T, CoverageError>;

/// Errors that can occur while building coverage polygons
#[derive(Error, Debug)]
pub enum CoverageError {
    #[error("Degenerate geometry for segment {segment}: {reason}")]
    DegenerateGeometry { segment: i64, reason: String },

    #[error("Projection produced non-finite coordinates ({x}, {y})")]
    ProjectionFailure { x: f64, y: f64 },

    #[error("Split failed: {0}")]
    SplitFailure(String),

    #[error("Malformed boundary for region {region}: {reason}")]
    MalformedBoundary { region: String, reason: String },

    #[error("Way {way} references unknown node {node}")]
    MissingNode { way: i64, node: i64 },

    #[error("Source failed for region {region}: {reason}")]
    Source { region: String, reason: String },

    #[error("Worker pool error: {0}")]
    WorkerPool(String),

    #[error("Pipeline for region {region} panicked")]
    RegionPanicked { region: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoverageError {
    /// Whether this error only affects a single segment, way or cut and should be
    /// skipped rather than abort the region.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            CoverageError::DegenerateGeometry { .. }
                | CoverageError::MissingNode { .. }
                | CoverageError::SplitFailure(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_errors() {
        assert!(CoverageError::SplitFailure("no crossing".into()).is_local());
        assert!(CoverageError::MissingNode { way: 1, node: 2 }.is_local());
        assert!(!CoverageError::ProjectionFailure { x: f64::NAN, y: 0.0 }.is_local());
    }

    #[test]
    fn test_error_messages() {
        let err = CoverageError::DegenerateGeometry {
            segment: 42,
            reason: "zero length".into(),
        };
        assert_eq!(err.to_string(), "Degenerate geometry for segment 42: zero length");
    }
}
