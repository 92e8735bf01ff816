//! Courier position tracking and orchestration
//!
//! The TrackingService is the entry point for the core. It coordinates:
//! - Position persistence (append-only history per courier)
//! - Store proximity evaluation and entry dispatch
//! - Read-side queries (history, latest position, travelled distance)

mod handlers;

pub use handlers::format_distance;

use crate::infra::metrics::Metrics;
use crate::infra::storage::{EntryStore, LocationStore, StoreCatalog};
use crate::services::distance::MetricSelector;
use crate::services::notifier::EntryNotifier;
use crate::services::proximity::{ProximityEngine, ProximityPolicy};
use std::sync::Arc;

/// Orchestrates position recording and courier queries
///
/// All operations take `&self`; the service is shared across request tasks
/// behind an `Arc`.
pub struct TrackingService {
    /// Raw position history
    pub(crate) locations: Arc<dyn LocationStore>,
    /// Decides fresh store entries and dispatches them
    pub(crate) proximity: ProximityEngine,
    /// Active distance metric, also used for travelled distance
    pub(crate) selector: Arc<MetricSelector>,
    /// Metrics collector
    pub(crate) metrics: Arc<Metrics>,
}

impl TrackingService {
    /// Create a new TrackingService wired to the given collaborators
    pub fn new(
        locations: Arc<dyn LocationStore>,
        catalog: Arc<dyn StoreCatalog>,
        entries: Arc<dyn EntryStore>,
        selector: Arc<MetricSelector>,
        notifier: Arc<EntryNotifier>,
        metrics: Arc<Metrics>,
    ) -> Self {
        let proximity =
            ProximityEngine::new(catalog, entries, selector.clone(), notifier, metrics.clone());
        Self { locations, proximity, selector, metrics }
    }

    /// Override the radius and cooldown policy
    pub fn with_policy(mut self, policy: ProximityPolicy) -> Self {
        self.proximity = self.proximity.with_policy(policy);
        self
    }

    pub fn selector(&self) -> &Arc<MetricSelector> {
        &self.selector
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }
}
