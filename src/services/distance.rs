//! Distance metrics and the runtime-swappable metric selector
//!
//! Two metrics are provided:
//! - `HaversineMetric` - great-circle distance on a sphere of radius 6,371 km (default)
//! - `PlanarMetric` - flat-earth projection, only meaningful below ~1 km
//!
//! The planar result diverges from the great-circle one at larger scales. That
//! divergence is a property of the approximation, not an error.

use crate::domain::types::Coordinate;
use parking_lot::RwLock;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

/// Mean Earth radius in meters
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Meters per degree of latitude used by the planar projection
pub const METERS_PER_DEGREE_LAT: f64 = 111_320.0;

/// Distance between two coordinates, in meters
///
/// Implementations must be pure and symmetric.
pub trait DistanceMetric: Send + Sync {
    fn distance(&self, a: Coordinate, b: Coordinate) -> f64;

    fn name(&self) -> &str;
}

/// Great-circle distance using the haversine formula
#[derive(Debug, Clone, Copy, Default)]
pub struct HaversineMetric;

impl DistanceMetric for HaversineMetric {
    fn distance(&self, a: Coordinate, b: Coordinate) -> f64 {
        let lat1 = a.lat.to_radians();
        let lat2 = b.lat.to_radians();
        let dlat = (b.lat - a.lat).to_radians();
        let dlng = (b.lng - a.lng).to_radians();

        let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
        // Clamp guards asin against rounding just above 1.0 for antipodal points
        let c = 2.0 * h.sqrt().min(1.0).asin();

        EARTH_RADIUS_METERS * c
    }

    fn name(&self) -> &str {
        "haversine"
    }
}

/// Planar approximation: degree deltas scaled to meters, then Euclidean
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanarMetric;

impl DistanceMetric for PlanarMetric {
    fn distance(&self, a: Coordinate, b: Coordinate) -> f64 {
        let avg_lat = ((a.lat + b.lat) / 2.0).to_radians();
        let meters_per_degree_lng = METERS_PER_DEGREE_LAT * avg_lat.cos();

        let dy = (b.lat - a.lat) * METERS_PER_DEGREE_LAT;
        let dx = (b.lng - a.lng) * meters_per_degree_lng;

        dx.hypot(dy)
    }

    fn name(&self) -> &str {
        "planar"
    }
}

/// Configurable metric selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    #[default]
    Haversine,
    #[serde(alias = "euclidean")]
    Planar,
}

impl MetricKind {
    pub fn build(self) -> Arc<dyn DistanceMetric> {
        match self {
            MetricKind::Haversine => Arc::new(HaversineMetric),
            MetricKind::Planar => Arc::new(PlanarMetric),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Haversine => "haversine",
            MetricKind::Planar => "planar",
        }
    }
}

impl std::str::FromStr for MetricKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "haversine" => Ok(MetricKind::Haversine),
            "planar" | "euclidean" => Ok(MetricKind::Planar),
            other => Err(format!("unknown distance metric: {other}")),
        }
    }
}

/// Holds the active distance metric
///
/// Swapping replaces a single `Arc`; each `compute` call clones the active
/// metric once, so a swap never affects a comparison already in progress.
pub struct MetricSelector {
    active: RwLock<Arc<dyn DistanceMetric>>,
}

impl MetricSelector {
    pub fn new(metric: Arc<dyn DistanceMetric>) -> Self {
        info!(metric = %metric.name(), "distance_metric_initialized");
        Self { active: RwLock::new(metric) }
    }

    pub fn from_kind(kind: MetricKind) -> Self {
        Self::new(kind.build())
    }

    /// Replace the active metric; takes effect for subsequent calls
    pub fn set_active(&self, metric: Arc<dyn DistanceMetric>) {
        let mut active = self.active.write();
        info!(from = %active.name(), to = %metric.name(), "distance_metric_switched");
        *active = metric;
    }

    pub fn active(&self) -> Arc<dyn DistanceMetric> {
        self.active.read().clone()
    }

    #[inline]
    pub fn compute(&self, a: Coordinate, b: Coordinate) -> f64 {
        self.active().distance(a, b)
    }
}

impl Default for MetricSelector {
    fn default() -> Self {
        Self::from_kind(MetricKind::Haversine)
    }
}
