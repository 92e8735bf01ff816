//! Services - business logic and state management
//!
//! This module contains the core business logic services:
//! - `tracker` - Position recording and courier queries
//! - `proximity` - Store radius detection with re-entry cooldown
//! - `distance` - Interchangeable distance metrics
//! - `notifier` - Fan-out of confirmed entries to registered reactions
//! - `reactions` - Built-in logging and persistence reactions
//! - `entries` - Read-side store entry queries

pub mod distance;
pub mod entries;
pub mod notifier;
pub mod proximity;
pub mod reactions;
pub mod tracker;

// Re-export commonly used types
pub use distance::{DistanceMetric, HaversineMetric, MetricKind, MetricSelector, PlanarMetric};
pub use entries::EntryQueryService;
pub use notifier::{EntryNotifier, EntryReaction};
pub use proximity::{ProximityEngine, ProximityPolicy};
pub use reactions::{LoggingReaction, PersistenceReaction};
pub use tracker::TrackingService;
