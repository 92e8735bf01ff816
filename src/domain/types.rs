//! Shared types for the courier tracker

use crate::domain::error::TrackerError;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Newtype wrapper for courier identifiers
///
/// Couriers are identified by UUID strings by convention. The core treats the
/// value as opaque; the HTTP boundary is where the UUID format is enforced.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CourierId(pub String);

impl CourierId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CourierId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CourierId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Newtype wrapper for store IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct StoreId(pub i64);

impl std::fmt::Display for StoreId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Newtype wrapper for persisted location IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct LocationId(pub u64);

impl std::fmt::Display for LocationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Newtype wrapper for persisted store entry IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct EntryId(pub u64);

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A latitude/longitude pair in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    #[inline]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Build a coordinate, rejecting values outside the valid lat/lng range
    pub fn checked(lat: f64, lng: f64) -> Result<Self, TrackerError> {
        let coordinate = Self::new(lat, lng);
        coordinate.validate()?;
        Ok(coordinate)
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }

    pub fn validate(&self) -> Result<(), TrackerError> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(TrackerError::InvalidCoordinate { lat: self.lat, lng: self.lng })
        }
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.lat, self.lng)
    }
}

/// A single position report from a courier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionReport {
    pub courier_id: CourierId,
    pub coordinate: Coordinate,
    /// Time the position was observed by the courier device, not time of receipt
    pub observed_at: DateTime<Utc>,
}

impl PositionReport {
    pub fn new(courier_id: CourierId, coordinate: Coordinate, observed_at: DateTime<Utc>) -> Self {
        Self { courier_id, coordinate, observed_at }
    }
}

/// A position report after it has been persisted
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedPosition {
    pub id: LocationId,
    pub courier_id: CourierId,
    pub lat: f64,
    pub lng: f64,
    #[serde(rename = "timestamp")]
    pub observed_at: DateTime<Utc>,
    #[serde(skip)]
    pub created_at: DateTime<Utc>,
}

impl RecordedPosition {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }
}

/// A store with a fixed location
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Store {
    pub id: StoreId,
    pub name: String,
    pub coordinate: Coordinate,
}

/// Confirmed entry of a courier into a store's radius
///
/// Produced by the proximity engine and handed to the notifier. Not persisted
/// by itself; persistence is one of the reactions.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryEvent {
    pub courier_id: CourierId,
    pub store: Store,
    pub coordinate: Coordinate,
    /// Distance from the store, rounded to 2 decimals
    pub distance_meters: f64,
    pub entry_time: DateTime<Utc>,
}

/// Entry data handed to an [`EntryStore`](crate::infra::storage::EntryStore) for saving
#[derive(Debug, Clone, PartialEq)]
pub struct NewEntry {
    pub courier_id: CourierId,
    pub store_id: StoreId,
    pub store_name: String,
    pub entry_time: DateTime<Utc>,
    pub distance_meters: f64,
}

/// Durable record of a confirmed store entry
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryRecord {
    pub id: EntryId,
    pub courier_id: CourierId,
    #[serde(skip)]
    pub store_id: StoreId,
    pub store_name: String,
    pub entry_time: DateTime<Utc>,
    #[serde(rename = "distanceFromStore")]
    pub distance_meters: f64,
    #[serde(skip)]
    pub created_at: DateTime<Utc>,
}

/// Result of recording a position
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionResponse {
    #[serde(flatten)]
    pub position: RecordedPosition,
    #[serde(skip)]
    pub entered_stores: Vec<String>,
    pub message: String,
}

/// Cumulative travel distance for a courier
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelDistance {
    pub courier_id: CourierId,
    #[serde(rename = "totalDistance")]
    pub total_meters: f64,
    #[serde(rename = "formattedDistance")]
    pub formatted: String,
}

/// Deserialize a timestamp given either as RFC 3339 or as a zone-less local time
///
/// Zone-less values (e.g. `2024-01-15T10:30:00`) are interpreted as UTC.
pub fn deserialize_observed_at<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::{self, Visitor};

    struct ObservedAtVisitor;

    impl<'de> Visitor<'de> for ObservedAtVisitor {
        type Value = DateTime<Utc>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("an RFC 3339 or ISO 8601 local timestamp")
        }

        fn visit_str<E>(self, value: &str) -> Result<DateTime<Utc>, E>
        where
            E: de::Error,
        {
            parse_timestamp(value).ok_or_else(|| E::custom(format!("invalid timestamp: {value}")))
        }
    }

    deserializer.deserialize_str(ObservedAtVisitor)
}

/// Parse an RFC 3339 timestamp or a zone-less ISO 8601 timestamp (as UTC)
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
