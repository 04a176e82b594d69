//! Greedy nearest-neighbour route ordering with emission statistics.

use crate::emissions::{calculate_emissions, TransportMode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Rough conversion from a lat/lng degree to kilometres.
pub const KM_PER_DEGREE: f64 = 111.0;
/// Load assumed for route emission statistics.
pub const DEFAULT_WEIGHT_KG: f64 = 1000.0;
/// An unoptimized route is modelled as this much longer than the optimized one.
pub const BASELINE_DETOUR: f64 = 1.45;

/// A stop supplied by the client. Fields other than `lat`/`lng` are kept and
/// echoed back in the optimized route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Location {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self {
            lat,
            lng,
            extra: Map::new(),
        }
    }

    /// Euclidean distance in raw degree units.
    pub fn degree_distance(&self, other: &Location) -> f64 {
        ((self.lat - other.lat).powi(2) + (self.lng - other.lng).powi(2)).sqrt()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("Need at least 2 points")]
    TooFewPoints,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RouteStats {
    pub total_distance_km: f64,
    #[serde(rename = "optimized")]
    pub optimized_emission: f64,
    #[serde(rename = "baseline")]
    pub baseline_emission: f64,
    #[serde(rename = "saved")]
    pub saved_emission: f64,
    #[serde(rename = "percent")]
    pub percent_reduction: f64,
}

impl RouteStats {
    fn from_distance(total_distance_km: f64) -> Self {
        let optimized_emission =
            calculate_emissions(total_distance_km, DEFAULT_WEIGHT_KG, TransportMode::Road);
        let baseline_emission = calculate_emissions(
            total_distance_km * BASELINE_DETOUR,
            DEFAULT_WEIGHT_KG,
            TransportMode::Road,
        );
        let saved_emission = (baseline_emission - optimized_emission).max(0.0);
        let percent_reduction = if baseline_emission > 0.0 {
            saved_emission / baseline_emission * 100.0
        } else {
            0.0
        };

        Self {
            total_distance_km,
            optimized_emission,
            baseline_emission,
            saved_emission,
            percent_reduction,
        }
    }
}

/// Result of [`optimize_route`], serialized as the `/optimize` response body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutePlan {
    #[serde(rename = "optimized_route")]
    pub path: Vec<Location>,
    pub logs: Vec<String>,
    pub stats: RouteStats,
}

/// Order `locations` by repeatedly hopping to the closest unvisited stop,
/// starting from the first one.
pub fn optimize_route(locations: &[Location]) -> Result<RoutePlan, RouteError> {
    if locations.len() < 2 {
        return Err(RouteError::TooFewPoints);
    }

    let mut unvisited: Vec<Location> = locations.to_vec();
    let mut current = unvisited.remove(0);
    let mut path = Vec::with_capacity(locations.len());
    let mut logs = vec!["Optimization Started...".to_string()];
    let mut total_degrees = 0.0;

    while !unvisited.is_empty() {
        // Strict comparison keeps the earliest stop on ties
        let mut nearest = 0;
        let mut nearest_distance = current.degree_distance(&unvisited[0]);
        for (idx, candidate) in unvisited.iter().enumerate().skip(1) {
            let distance = current.degree_distance(candidate);
            if distance < nearest_distance {
                nearest = idx;
                nearest_distance = distance;
            }
        }

        let next = unvisited.remove(nearest);
        logs.push(format!("Connected to nearest node at {:.4}", next.lat));
        total_degrees += nearest_distance;
        path.push(std::mem::replace(&mut current, next));
    }
    path.push(current);

    Ok(RoutePlan {
        path,
        logs,
        stats: RouteStats::from_distance(total_degrees * KM_PER_DEGREE),
    })
}
