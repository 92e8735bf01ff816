//! Error types for the courier tracker

use crate::domain::types::StoreId;
use thiserror::Error;

/// Errors surfaced by the tracking core and its collaborators
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Latitude or longitude outside the valid range
    #[error("Invalid coordinate ({lat}, {lng}): latitude must be within [-90, 90] and longitude within [-180, 180]")]
    InvalidCoordinate { lat: f64, lng: f64 },

    /// Courier ID missing or not a UUID
    #[error("Invalid courier ID: {0}")]
    InvalidCourierId(String),

    /// Request body or parameters could not be interpreted
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Store not found with ID: {0}")]
    StoreNotFound(StoreId),

    /// Backing store unavailable or rejected the operation
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TrackerError {
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Whether the error was caused by the caller's input
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidCoordinate { .. } | Self::InvalidCourierId(_) | Self::InvalidRequest(_)
        )
    }
}

pub type Result<T, E = TrackerError> = std::result::Result<T, E>;
