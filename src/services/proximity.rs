//! Store proximity detection
//!
//! Decides which stores a courier has freshly entered for a new position.
//! A store counts as entered when:
//! - Distance: courier within `radius_meters` of the store (default 100 m)
//! - Cooldown: no entry recorded for the same courier+store within the last
//!   `cooldown` before the report's observation time (default 60 s)
//!
//! The cooldown check reads the entry store and the persistence reaction
//! writes it afterwards. Two concurrent reports for the same courier+store can
//! both pass the check; detection is best-effort in that window.

use crate::domain::error::Result;
use crate::domain::types::{EntryEvent, PositionReport};
use crate::infra::metrics::Metrics;
use crate::infra::storage::{EntryStore, StoreCatalog};
use crate::services::distance::MetricSelector;
use crate::services::notifier::EntryNotifier;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info};

/// Detection radius around each store (100 meters)
pub const STORE_RADIUS_METERS: f64 = 100.0;

/// Window in which a repeat entry at the same store is suppressed (60 seconds)
pub const REENTRY_COOLDOWN_SECONDS: i64 = 60;

/// Radius and cooldown policy
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProximityPolicy {
    pub radius_meters: f64,
    pub cooldown: Duration,
}

impl Default for ProximityPolicy {
    fn default() -> Self {
        Self {
            radius_meters: STORE_RADIUS_METERS,
            cooldown: Duration::seconds(REENTRY_COOLDOWN_SECONDS),
        }
    }
}

/// Evaluates positions against the store catalog
pub struct ProximityEngine {
    catalog: Arc<dyn StoreCatalog>,
    entries: Arc<dyn EntryStore>,
    selector: Arc<MetricSelector>,
    notifier: Arc<EntryNotifier>,
    metrics: Arc<Metrics>,
    policy: ProximityPolicy,
}

impl ProximityEngine {
    pub fn new(
        catalog: Arc<dyn StoreCatalog>,
        entries: Arc<dyn EntryStore>,
        selector: Arc<MetricSelector>,
        notifier: Arc<EntryNotifier>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            catalog,
            entries,
            selector,
            notifier,
            metrics,
            policy: ProximityPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: ProximityPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> ProximityPolicy {
        self.policy
    }

    /// Evaluate a report and dispatch every confirmed entry
    ///
    /// Returns the confirmed events in catalog order.
    pub fn evaluate(&self, report: &PositionReport) -> Result<Vec<EntryEvent>> {
        let stores = self.catalog.all()?;
        // One metric for the whole scan, even if the selector is swapped mid-way
        let metric = self.selector.active();
        // A cooldown reaching past the representable range covers all history
        let since = report
            .observed_at
            .checked_sub_signed(self.policy.cooldown)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        let mut confirmed = Vec::new();
        for store in stores {
            let distance = metric.distance(report.coordinate, store.coordinate);
            if distance > self.policy.radius_meters {
                continue;
            }

            let recent =
                self.entries.exists_for_courier_store_since(&report.courier_id, store.id, since)?;
            if recent {
                self.metrics.record_entry_suppressed();
                debug!(
                    courier_id = %report.courier_id,
                    store = %store.name,
                    distance_m = format!("{:.2}", distance),
                    "store_entry_suppressed"
                );
                continue;
            }

            info!(
                courier_id = %report.courier_id,
                store = %store.name,
                distance_m = format!("{:.2}", distance),
                metric = %metric.name(),
                "store_entry_confirmed"
            );

            let event = EntryEvent {
                courier_id: report.courier_id.clone(),
                store,
                coordinate: report.coordinate,
                distance_meters: round_to_cents(distance),
                entry_time: report.observed_at,
            };
            self.notifier.dispatch(&event);
            self.metrics.record_entry_confirmed();
            confirmed.push(event);
        }

        Ok(confirmed)
    }
}

/// Round to 2 decimal places
#[inline]
fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
