//! Entry journal egress - appends confirmed store entries to a file
//!
//! Entries are written in JSONL format (one JSON object per line)
//! to the file specified in config.

use crate::domain::types::EntryEvent;
use crate::services::notifier::EntryReaction;
use anyhow::Context;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

/// One journal line
#[derive(Debug, Serialize)]
struct JournalLine<'a> {
    courier_id: &'a str,
    store_id: i64,
    store: &'a str,
    lat: f64,
    lng: f64,
    distance_m: f64,
    entry_time: String,
}

impl<'a> From<&'a EntryEvent> for JournalLine<'a> {
    fn from(event: &'a EntryEvent) -> Self {
        Self {
            courier_id: event.courier_id.as_str(),
            store_id: event.store.id.0,
            store: &event.store.name,
            lat: event.coordinate.lat,
            lng: event.coordinate.lng,
            distance_m: event.distance_meters,
            entry_time: event.entry_time.to_rfc3339(),
        }
    }
}

/// Reaction that journals entries to a JSONL file
pub struct EgressReaction {
    file_path: String,
}

impl EgressReaction {
    pub fn new(file_path: &str) -> Self {
        info!(file_path = %file_path, "egress_initialized");
        Self { file_path: file_path.to_string() }
    }

    /// Append a line to the egress file
    fn append_line(&self, line: &str) -> std::io::Result<()> {
        let path = Path::new(&self.file_path);

        // Create parent directories if they don't exist
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;

        writeln!(file, "{}", line)?;
        debug!(file = %self.file_path, bytes = %line.len(), "egress_written");

        Ok(())
    }
}

impl EntryReaction for EgressReaction {
    fn name(&self) -> &str {
        "egress"
    }

    fn on_entry(&self, event: &EntryEvent) -> anyhow::Result<()> {
        let json = serde_json::to_string(&JournalLine::from(event))?;
        self.append_line(&json)
            .with_context(|| format!("Failed to append to egress file {}", self.file_path))
    }
}
