//! Operation handlers for the TrackingService
//!
//! `record_position` is the single write path; the rest are read-only queries.

use super::TrackingService;
use crate::domain::error::Result;
use crate::domain::types::{
    CourierId, PositionReport, PositionResponse, RecordedPosition, TravelDistance,
};
use std::time::Instant;
use tracing::{debug, info};

impl TrackingService {
    /// Persist a position, evaluate store proximity, and summarize the outcome
    ///
    /// Reaction failures are absorbed by the notifier. Storage failures
    /// propagate to the caller.
    pub fn record_position(&self, report: PositionReport) -> Result<PositionResponse> {
        let start = Instant::now();

        info!(
            courier_id = %report.courier_id,
            lat = %report.coordinate.lat,
            lng = %report.coordinate.lng,
            observed_at = %report.observed_at.to_rfc3339(),
            "position_received"
        );

        let position = self.locations.append(&report)?;
        let entered = self.proximity.evaluate(&report)?;
        let entered_stores: Vec<String> = entered.into_iter().map(|e| e.store.name).collect();

        let message = if entered_stores.is_empty() {
            "Location recorded successfully".to_string()
        } else {
            format!("Location recorded. Entered store radius: {}", entered_stores.join(", "))
        };

        let latency_us = start.elapsed().as_micros() as u64;
        self.metrics.record_position(latency_us);
        debug!(
            location_id = %position.id,
            entered = %entered_stores.len(),
            latency_us = %latency_us,
            "position_recorded"
        );

        Ok(PositionResponse { position, entered_stores, message })
    }

    /// All positions for a courier, oldest first; empty for unknown couriers
    pub fn history(&self, courier_id: &CourierId) -> Result<Vec<RecordedPosition>> {
        self.locations.all_for_courier(courier_id)
    }

    /// Most recent position, or `None` when the courier has no history
    pub fn latest(&self, courier_id: &CourierId) -> Result<Option<RecordedPosition>> {
        self.locations.latest_for_courier(courier_id)
    }

    /// Sum of segment distances over the courier's ordered history
    ///
    /// Uses the currently active metric for every segment, so totals are only
    /// comparable while the metric stays the same.
    pub fn total_distance(&self, courier_id: &CourierId) -> Result<TravelDistance> {
        let history = self.locations.all_for_courier(courier_id)?;
        let metric = self.selector.active();

        let total_meters: f64 = history
            .windows(2)
            .map(|pair| metric.distance(pair[0].coordinate(), pair[1].coordinate()))
            .sum();
        let formatted = format_distance(total_meters);

        info!(
            courier_id = %courier_id,
            segments = %history.len().saturating_sub(1),
            total_m = %total_meters,
            formatted = %formatted,
            metric = %metric.name(),
            "total_distance_computed"
        );

        Ok(TravelDistance { courier_id: courier_id.clone(), total_meters, formatted })
    }

    /// Number of stored positions across all couriers
    pub fn location_count(&self) -> Result<u64> {
        self.locations.count()
    }
}

/// Human-readable distance: `"0 m"`, `"X.XX m"` below 1 km, `"X.XX km"` from 1 km
pub fn format_distance(meters: f64) -> String {
    if meters == 0.0 {
        "0 m".to_string()
    } else if meters >= 1000.0 {
        format!("{:.2} km", meters / 1000.0)
    } else {
        format!("{:.2} m", meters)
    }
}
