//! End-to-end tracking flow over the public API with a seeded catalog

use chrono::{Duration, TimeZone, Utc};
use courier_tracker::domain::{Coordinate, CourierId, PositionReport};
use courier_tracker::infra::{
    MemoryEntryStore, MemoryLocationStore, MemoryStoreCatalog, Metrics, StoreCatalog,
};
use courier_tracker::io::{seed_catalog, EgressReaction};
use courier_tracker::services::{
    DistanceMetric, EntryNotifier, EntryQueryService, LoggingReaction, MetricKind, MetricSelector,
    PersistenceReaction, PlanarMetric, TrackingService,
};
use std::fs;
use std::sync::Arc;
use tempfile::tempdir;

struct Harness {
    tracking: TrackingService,
    queries: EntryQueryService,
    catalog: Arc<MemoryStoreCatalog>,
    metrics: Arc<Metrics>,
}

fn harness(journal: &std::path::Path) -> Harness {
    let catalog = Arc::new(MemoryStoreCatalog::new());
    let seeded = seed_catalog(
        catalog.as_ref(),
        concat!(env!("CARGO_MANIFEST_DIR"), "/config/stores.json"),
    )
    .unwrap();
    assert_eq!(seeded, 5);

    let entries = Arc::new(MemoryEntryStore::new());
    let metrics = Arc::new(Metrics::new());
    let notifier = Arc::new(EntryNotifier::with_metrics(metrics.clone()));
    notifier.register(Arc::new(LoggingReaction));
    notifier.register(Arc::new(PersistenceReaction::new(catalog.clone(), entries.clone())));
    notifier.register(Arc::new(EgressReaction::new(journal.to_str().unwrap())));

    let tracking = TrackingService::new(
        Arc::new(MemoryLocationStore::new()),
        catalog.clone(),
        entries.clone(),
        Arc::new(MetricSelector::from_kind(MetricKind::Haversine)),
        notifier,
        metrics.clone(),
    );
    Harness {
        tracking,
        queries: EntryQueryService::new(entries, catalog.clone()),
        catalog,
        metrics,
    }
}

fn report(courier: &str, lat: f64, lng: f64, minutes: i64) -> PositionReport {
    let base = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();
    PositionReport::new(
        CourierId::from(courier),
        Coordinate::new(lat, lng),
        base + Duration::minutes(minutes),
    )
}

#[test]
fn test_courier_route_past_two_stores() {
    let dir = tempdir().unwrap();
    let journal = dir.path().join("entries.jsonl");
    let h = harness(&journal);

    // Near Ataşehir, then Ataşehir again within the cooldown, then Novada
    let first = h.tracking.record_position(report("c-1", 40.9927, 29.1244, 0)).unwrap();
    assert_eq!(
        first.message,
        "Location recorded. Entered store radius: Ataşehir MMM Migros"
    );

    let repeat = h.tracking.record_position(report("c-1", 40.9925, 29.1245, 0)).unwrap();
    assert_eq!(repeat.message, "Location recorded successfully");

    let novada = h.tracking.record_position(report("c-1", 40.9862, 29.1162, 10)).unwrap();
    assert_eq!(novada.entered_stores, vec!["Novada MMM Migros".to_string()]);

    let entries = h.queries.entries_by_courier(&CourierId::from("c-1")).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].store_name, "Novada MMM Migros");
    assert_eq!(entries[1].store_name, "Ataşehir MMM Migros");

    let stores = h.catalog.all().unwrap();
    let ortakoy = stores.iter().find(|s| s.name.starts_with("Ortaköy")).unwrap();
    assert!(h.queries.entries_by_store(ortakoy.id).unwrap().is_empty());

    let lines = fs::read_to_string(&journal).unwrap();
    assert_eq!(lines.lines().count(), 2);

    assert_eq!(h.metrics.positions_total(), 3);
    assert_eq!(h.metrics.entries_confirmed_total(), 2);
    assert_eq!(h.metrics.entries_suppressed_total(), 1);
    assert_eq!(h.metrics.reaction_failures_total(), 0);

    let travelled = h.tracking.total_distance(&CourierId::from("c-1")).unwrap();
    assert!(travelled.total_meters > 1000.0);
    assert!(travelled.formatted.ends_with(" km"));
}

#[test]
fn test_broken_journal_does_not_block_persistence() {
    let dir = tempdir().unwrap();
    // A directory path cannot be appended to, so the journal reaction fails
    let h = harness(dir.path());

    let response = h.tracking.record_position(report("c-2", 40.9927, 29.1244, 0)).unwrap();
    assert_eq!(response.entered_stores.len(), 1);
    assert_eq!(h.queries.total_count().unwrap(), 1);
    assert_eq!(h.metrics.reaction_failures_total(), 1);
}

#[test]
fn test_metric_swap_applies_to_later_reports() {
    let dir = tempdir().unwrap();
    let h = harness(&dir.path().join("entries.jsonl"));

    h.tracking.selector().set_active(Arc::new(PlanarMetric));
    assert_eq!(h.tracking.selector().active().name(), "planar");

    let response = h.tracking.record_position(report("c-3", 40.9927, 29.1244, 0)).unwrap();
    assert_eq!(response.entered_stores, vec!["Ataşehir MMM Migros".to_string()]);
}
