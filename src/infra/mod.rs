//! Infrastructure - configuration, metrics, and storage
//!
//! This module contains infrastructure concerns:
//! - `config` - Application configuration (TOML loading, defaults)
//! - `metrics` - Lock-free metrics collection
//! - `storage` - Storage traits and in-memory backends

pub mod config;
pub mod metrics;
pub mod storage;

// Re-export commonly used types
pub use config::Config;
pub use metrics::Metrics;
pub use storage::{
    EntryStore, LocationStore, MemoryEntryStore, MemoryLocationStore, MemoryStoreCatalog,
    StoreCatalog,
};
