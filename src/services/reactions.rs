//! Built-in entry reactions
//!
//! - `LoggingReaction` - structured log line per entry, no state changes
//! - `PersistenceReaction` - writes an `EntryRecord` through the entry store
//!
//! The JSONL journal reaction lives in `io::egress`.

use crate::domain::types::{EntryEvent, NewEntry};
use crate::infra::storage::{EntryStore, StoreCatalog};
use crate::services::notifier::EntryReaction;
use anyhow::{anyhow, Context};
use std::sync::Arc;
use tracing::{debug, info};

pub struct LoggingReaction;

impl EntryReaction for LoggingReaction {
    fn name(&self) -> &str {
        "logging"
    }

    fn on_entry(&self, event: &EntryEvent) -> anyhow::Result<()> {
        info!(
            courier_id = %event.courier_id,
            store_id = %event.store.id,
            store = %event.store.name,
            entry_time = %event.entry_time.to_rfc3339(),
            distance_m = format!("{:.2}", event.distance_meters),
            courier_lat = %event.coordinate.lat,
            courier_lng = %event.coordinate.lng,
            store_lat = %event.store.coordinate.lat,
            store_lng = %event.store.coordinate.lng,
            "store_entry_detected"
        );
        Ok(())
    }
}

/// Persists confirmed entries
///
/// The store is re-fetched from the catalog by id so the record always refers
/// to the catalog's current row rather than the copy carried by the event.
pub struct PersistenceReaction {
    catalog: Arc<dyn StoreCatalog>,
    entries: Arc<dyn EntryStore>,
}

impl PersistenceReaction {
    pub fn new(catalog: Arc<dyn StoreCatalog>, entries: Arc<dyn EntryStore>) -> Self {
        Self { catalog, entries }
    }
}

impl EntryReaction for PersistenceReaction {
    fn name(&self) -> &str {
        "persistence"
    }

    fn on_entry(&self, event: &EntryEvent) -> anyhow::Result<()> {
        let store = self
            .catalog
            .by_id(event.store.id)
            .context("store lookup failed")?
            .ok_or_else(|| anyhow!("store {} not found", event.store.id))?;

        let record = self
            .entries
            .save(NewEntry {
                courier_id: event.courier_id.clone(),
                store_id: store.id,
                store_name: store.name,
                entry_time: event.entry_time,
                distance_meters: event.distance_meters,
            })
            .context("saving store entry failed")?;

        debug!(entry_id = %record.id, courier_id = %record.courier_id, "store_entry_persisted");
        Ok(())
    }
}
