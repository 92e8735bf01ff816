//! Read-side queries over confirmed store entries

use crate::domain::error::{Result, TrackerError};
use crate::domain::types::{CourierId, EntryRecord, StoreId};
use crate::infra::storage::{EntryStore, StoreCatalog};
use std::sync::Arc;
use tracing::debug;

pub struct EntryQueryService {
    entries: Arc<dyn EntryStore>,
    catalog: Arc<dyn StoreCatalog>,
}

impl EntryQueryService {
    pub fn new(entries: Arc<dyn EntryStore>, catalog: Arc<dyn StoreCatalog>) -> Self {
        Self { entries, catalog }
    }

    /// Entries for a courier, newest first
    pub fn entries_by_courier(&self, courier_id: &CourierId) -> Result<Vec<EntryRecord>> {
        let entries = self.entries.by_courier(courier_id)?;
        debug!(courier_id = %courier_id, count = %entries.len(), "entries_by_courier");
        Ok(entries)
    }

    /// Entries for a store, newest first. Unknown stores are an error.
    pub fn entries_by_store(&self, store_id: StoreId) -> Result<Vec<EntryRecord>> {
        if self.catalog.by_id(store_id)?.is_none() {
            return Err(TrackerError::StoreNotFound(store_id));
        }
        let entries = self.entries.by_store(store_id)?;
        debug!(store_id = %store_id, count = %entries.len(), "entries_by_store");
        Ok(entries)
    }

    pub fn all_entries(&self) -> Result<Vec<EntryRecord>> {
        self.entries.all()
    }

    pub fn count_by_courier(&self, courier_id: &CourierId) -> Result<u64> {
        self.entries.count_by_courier(courier_id)
    }

    pub fn total_count(&self) -> Result<u64> {
        self.entries.count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{Coordinate, NewEntry};
    use crate::infra::storage::{MemoryEntryStore, MemoryStoreCatalog};
    use chrono::{Duration, TimeZone, Utc};

    fn setup() -> (EntryQueryService, Arc<MemoryEntryStore>, StoreId) {
        let entries = Arc::new(MemoryEntryStore::new());
        let catalog = Arc::new(MemoryStoreCatalog::new());
        let store =
            catalog.insert("Novada MMM Migros", Coordinate::new(40.986106, 29.1161293)).unwrap();
        (EntryQueryService::new(entries.clone(), catalog), entries, store.id)
    }

    fn save(entries: &MemoryEntryStore, courier: &str, store_id: StoreId, minutes: i64) {
        let base = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();
        entries
            .save(NewEntry {
                courier_id: CourierId::from(courier),
                store_id,
                store_name: "Novada MMM Migros".to_string(),
                entry_time: base + Duration::minutes(minutes),
                distance_meters: 20.0,
            })
            .unwrap();
    }

    #[test]
    fn test_entries_by_store_unknown() {
        let (service, _, _) = setup();
        let err = service.entries_by_store(StoreId(404)).unwrap_err();
        assert!(matches!(err, TrackerError::StoreNotFound(StoreId(404))));
        assert_eq!(err.to_string(), "Store not found with ID: 404");
    }

    #[test]
    fn test_entries_by_store_newest_first() {
        let (service, entries, store_id) = setup();
        save(&entries, "c1", store_id, 0);
        save(&entries, "c2", store_id, 5);

        let result = service.entries_by_store(store_id).unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].courier_id, CourierId::from("c2"));
    }

    #[test]
    fn test_counts_and_courier_queries() {
        let (service, entries, store_id) = setup();
        save(&entries, "c1", store_id, 0);
        save(&entries, "c1", store_id, 2);
        save(&entries, "c2", store_id, 1);

        assert_eq!(service.total_count().unwrap(), 3);
        assert_eq!(service.count_by_courier(&CourierId::from("c1")).unwrap(), 2);
        assert_eq!(service.entries_by_courier(&CourierId::from("c1")).unwrap().len(), 2);
        assert!(service.entries_by_courier(&CourierId::from("nobody")).unwrap().is_empty());
        assert_eq!(service.all_entries().unwrap().len(), 3);
    }
}
