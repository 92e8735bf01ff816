//! Persistence abstractions and in-memory backends
//!
//! The tracking core only talks to these traits:
//! - `LocationStore` - append-only courier position history
//! - `StoreCatalog` - registered stores, seeded once at startup
//! - `EntryStore` - confirmed store entry records
//!
//! The in-memory backends keep per-key indexes under `parking_lot` locks so
//! every query is served without scanning unrelated couriers or stores.

use crate::domain::error::Result;
use crate::domain::types::{
    Coordinate, CourierId, EntryId, EntryRecord, LocationId, NewEntry, PositionReport,
    RecordedPosition, Store, StoreId,
};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// Raw position history
pub trait LocationStore: Send + Sync {
    /// Persist a report and return the stored row
    fn append(&self, report: &PositionReport) -> Result<RecordedPosition>;

    /// All positions for a courier ordered by observation time, oldest first
    fn all_for_courier(&self, courier_id: &CourierId) -> Result<Vec<RecordedPosition>>;

    /// Most recently observed position for a courier
    fn latest_for_courier(&self, courier_id: &CourierId) -> Result<Option<RecordedPosition>>;

    fn count(&self) -> Result<u64>;
}

/// Registered stores
pub trait StoreCatalog: Send + Sync {
    /// All stores in catalog order (insertion order)
    fn all(&self) -> Result<Vec<Store>>;

    fn by_id(&self, id: StoreId) -> Result<Option<Store>>;

    fn insert(&self, name: &str, coordinate: Coordinate) -> Result<Store>;

    fn is_empty(&self) -> Result<bool> {
        Ok(self.all()?.is_empty())
    }
}

/// Confirmed store entries
pub trait EntryStore: Send + Sync {
    fn save(&self, entry: NewEntry) -> Result<EntryRecord>;

    /// Whether an entry exists for the pair with `entry_time` strictly after `since`
    fn exists_for_courier_store_since(
        &self,
        courier_id: &CourierId,
        store_id: StoreId,
        since: DateTime<Utc>,
    ) -> Result<bool>;

    /// Entries for a courier, newest first
    fn by_courier(&self, courier_id: &CourierId) -> Result<Vec<EntryRecord>>;

    /// Entries for a store, newest first
    fn by_store(&self, store_id: StoreId) -> Result<Vec<EntryRecord>>;

    /// All entries in insertion order
    fn all(&self) -> Result<Vec<EntryRecord>>;

    fn count_by_courier(&self, courier_id: &CourierId) -> Result<u64>;

    fn count(&self) -> Result<u64>;
}

/// In-memory position history, indexed by courier
#[derive(Default)]
pub struct MemoryLocationStore {
    by_courier: RwLock<FxHashMap<CourierId, Vec<RecordedPosition>>>,
    next_id: AtomicU64,
    total: AtomicU64,
}

impl MemoryLocationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocationStore for MemoryLocationStore {
    fn append(&self, report: &PositionReport) -> Result<RecordedPosition> {
        let id = LocationId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let recorded = RecordedPosition {
            id,
            courier_id: report.courier_id.clone(),
            lat: report.coordinate.lat,
            lng: report.coordinate.lng,
            observed_at: report.observed_at,
            created_at: Utc::now(),
        };

        let mut by_courier = self.by_courier.write();
        let history = by_courier.entry(report.courier_id.clone()).or_default();
        // Reports may arrive out of order; keep history sorted, ties in arrival order
        let idx = history.partition_point(|p| p.observed_at <= report.observed_at);
        history.insert(idx, recorded.clone());
        self.total.fetch_add(1, Ordering::Relaxed);

        Ok(recorded)
    }

    fn all_for_courier(&self, courier_id: &CourierId) -> Result<Vec<RecordedPosition>> {
        Ok(self.by_courier.read().get(courier_id).cloned().unwrap_or_default())
    }

    fn latest_for_courier(&self, courier_id: &CourierId) -> Result<Option<RecordedPosition>> {
        Ok(self.by_courier.read().get(courier_id).and_then(|h| h.last().cloned()))
    }

    fn count(&self) -> Result<u64> {
        Ok(self.total.load(Ordering::Relaxed))
    }
}

/// In-memory store catalog
#[derive(Default)]
pub struct MemoryStoreCatalog {
    stores: RwLock<Vec<Store>>,
    next_id: AtomicI64,
}

impl MemoryStoreCatalog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StoreCatalog for MemoryStoreCatalog {
    fn all(&self) -> Result<Vec<Store>> {
        Ok(self.stores.read().clone())
    }

    fn by_id(&self, id: StoreId) -> Result<Option<Store>> {
        Ok(self.stores.read().iter().find(|s| s.id == id).cloned())
    }

    fn insert(&self, name: &str, coordinate: Coordinate) -> Result<Store> {
        coordinate.validate()?;
        let store = Store {
            id: StoreId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1),
            name: name.to_string(),
            coordinate,
        };
        self.stores.write().push(store.clone());
        Ok(store)
    }

    fn is_empty(&self) -> Result<bool> {
        Ok(self.stores.read().is_empty())
    }
}

#[derive(Default)]
struct EntryTables {
    records: Vec<EntryRecord>,
    /// Indexes into `records`, per courier
    by_courier: FxHashMap<CourierId, Vec<usize>>,
    /// Indexes into `records`, per store
    by_store: FxHashMap<StoreId, Vec<usize>>,
}

impl EntryTables {
    fn newest_first(&self, indexes: Option<&Vec<usize>>) -> Vec<EntryRecord> {
        let mut records: Vec<EntryRecord> = indexes
            .map(|idx| idx.iter().map(|&i| self.records[i].clone()).collect())
            .unwrap_or_default();
        records.sort_by(|a, b| b.entry_time.cmp(&a.entry_time));
        records
    }
}

/// In-memory entry records, indexed by courier and by store
#[derive(Default)]
pub struct MemoryEntryStore {
    tables: RwLock<EntryTables>,
    next_id: AtomicU64,
}

impl MemoryEntryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EntryStore for MemoryEntryStore {
    fn save(&self, entry: NewEntry) -> Result<EntryRecord> {
        let record = EntryRecord {
            id: EntryId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1),
            courier_id: entry.courier_id,
            store_id: entry.store_id,
            store_name: entry.store_name,
            entry_time: entry.entry_time,
            distance_meters: entry.distance_meters,
            created_at: Utc::now(),
        };

        let mut tables = self.tables.write();
        let idx = tables.records.len();
        tables.by_courier.entry(record.courier_id.clone()).or_default().push(idx);
        tables.by_store.entry(record.store_id).or_default().push(idx);
        tables.records.push(record.clone());

        Ok(record)
    }

    fn exists_for_courier_store_since(
        &self,
        courier_id: &CourierId,
        store_id: StoreId,
        since: DateTime<Utc>,
    ) -> Result<bool> {
        let tables = self.tables.read();
        let Some(indexes) = tables.by_courier.get(courier_id) else {
            return Ok(false);
        };
        Ok(indexes
            .iter()
            .map(|&i| &tables.records[i])
            .any(|r| r.store_id == store_id && r.entry_time > since))
    }

    fn by_courier(&self, courier_id: &CourierId) -> Result<Vec<EntryRecord>> {
        let tables = self.tables.read();
        Ok(tables.newest_first(tables.by_courier.get(courier_id)))
    }

    fn by_store(&self, store_id: StoreId) -> Result<Vec<EntryRecord>> {
        let tables = self.tables.read();
        Ok(tables.newest_first(tables.by_store.get(&store_id)))
    }

    fn all(&self) -> Result<Vec<EntryRecord>> {
        Ok(self.tables.read().records.clone())
    }

    fn count_by_courier(&self, courier_id: &CourierId) -> Result<u64> {
        Ok(self.tables.read().by_courier.get(courier_id).map_or(0, |idx| idx.len() as u64))
    }

    fn count(&self) -> Result<u64> {
        Ok(self.tables.read().records.len() as u64)
    }
}
