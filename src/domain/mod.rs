//! Domain models - core business types
//!
//! This module contains the canonical data types used throughout the system:
//! - `Coordinate` - validated latitude/longitude pair
//! - `PositionReport` / `RecordedPosition` - courier position history
//! - `Store` - fixed location with a detection radius
//! - `EntryEvent` / `EntryRecord` - confirmed store entries
//! - `TrackerError` - error taxonomy shared by all layers

pub mod error;
pub mod types;

pub use error::TrackerError;
pub use types::{
    Coordinate, CourierId, EntryEvent, EntryId, EntryRecord, LocationId, NewEntry,
    PositionReport, PositionResponse, RecordedPosition, Store, StoreId, TravelDistance,
};
