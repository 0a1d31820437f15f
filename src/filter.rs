//! Which OSM railway ways count as coverage.

use crate::Way;

/// Decides whether a way contributes a corridor.
pub trait RailwayFilter: Send + Sync {
    fn accepts(&self, way: &Way) -> bool;
}

/// Accepts every way. Useful when the source already did the filtering.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl RailwayFilter for AcceptAll {
    fn accepts(&self, _way: &Way) -> bool {
        true
    }
}

/// Tag rules for passenger-relevant running lines.
///
/// A way is rejected when any of these hold:
/// - it has no `railway` tag, or `railway` is in [`Self::rejected_railway`]
/// - `service` is in [`Self::rejected_service`]
/// - `usage` is in [`Self::rejected_usage`]
/// - `abandoned:railway` or `disused:railway` is in [`Self::rejected_lifecycle`]
#[derive(Debug, Clone)]
pub struct RailwayTagFilter {
    pub rejected_railway: Vec<String>,
    pub rejected_service: Vec<String>,
    pub rejected_usage: Vec<String>,
    pub rejected_lifecycle: Vec<String>,
}

fn owned(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

impl Default for RailwayTagFilter {
    fn default() -> Self {
        Self {
            rejected_railway: owned(&[
                "abandoned",
                "disused",
                "razed",
                "construction",
                "proposed",
                "miniature",
                "loading_ramp",
                "traverser",
                "ferry",
            ]),
            rejected_service: owned(&["yard", "spur", "siding"]),
            rejected_usage: owned(&["industrial", "military", "test"]),
            rejected_lifecycle: owned(&["rail", "narrow_gauge", "tram", "yes"]),
        }
    }
}

impl RailwayTagFilter {
    fn is_rejected(list: &[String], value: Option<&str>) -> bool {
        value.is_some_and(|v| list.iter().any(|r| r == v))
    }
}

impl RailwayFilter for RailwayTagFilter {
    fn accepts(&self, way: &Way) -> bool {
        let Some(railway) = way.tag("railway") else {
            return false;
        };
        !(Self::is_rejected(&self.rejected_railway, Some(railway))
            || Self::is_rejected(&self.rejected_service, way.tag("service"))
            || Self::is_rejected(&self.rejected_usage, way.tag("usage"))
            || Self::is_rejected(&self.rejected_lifecycle, way.tag("abandoned:railway"))
            || Self::is_rejected(&self.rejected_lifecycle, way.tag("disused:railway")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn way(tags: &[(&str, &str)]) -> Way {
        Way {
            id: 1,
            nodes: vec![1, 2],
            tags: tags.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect::<HashMap<_, _>>(),
        }
    }

    #[test]
    fn test_mainline_is_accepted() {
        let filter = RailwayTagFilter::default();
        assert!(filter.accepts(&way(&[("railway", "rail")])));
        assert!(filter.accepts(&way(&[("railway", "narrow_gauge"), ("usage", "main")])));
        assert!(filter.accepts(&way(&[("railway", "preserved"), ("service", "crossover")])));
    }

    #[test]
    fn test_rejections() {
        let filter = RailwayTagFilter::default();
        assert!(!filter.accepts(&way(&[])));
        assert!(!filter.accepts(&way(&[("railway", "construction")])));
        assert!(!filter.accepts(&way(&[("railway", "rail"), ("service", "yard")])));
        assert!(!filter.accepts(&way(&[("railway", "rail"), ("usage", "military")])));
        assert!(!filter.accepts(&way(&[("railway", "rail"), ("abandoned:railway", "yes")])));
        assert!(!filter.accepts(&way(&[("railway", "rail"), ("disused:railway", "tram")])));
    }

    #[test]
    fn test_accept_all() {
        assert!(AcceptAll.accepts(&way(&[])));
    }
}
