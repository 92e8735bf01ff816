//! IO modules - external system interfaces
//!
//! This module contains all external IO operations:
//! - `http` - REST API for position reports and queries, plus /metrics
//! - `egress` - Store entry journal to file (JSONL format)
//! - `seed` - Store catalog seeding from JSON

pub mod egress;
pub mod http;
pub mod seed;

// Re-export commonly used types
pub use egress::EgressReaction;
pub use http::{start_api_server, ApiState};
pub use seed::seed_catalog;
