//! Fan-out of confirmed store entries to independent reactions
//!
//! Reactions run in registration order. A reaction that returns an error or
//! panics is logged and skipped; the remaining reactions still run and the
//! caller of `dispatch` never sees the failure.

use crate::domain::types::EntryEvent;
use crate::infra::metrics::Metrics;
use parking_lot::RwLock;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Side-effecting handler invoked for each confirmed entry
pub trait EntryReaction: Send + Sync {
    /// Unique name; registration is deduplicated on it
    fn name(&self) -> &str;

    fn on_entry(&self, event: &EntryEvent) -> anyhow::Result<()>;
}

/// Outcome of a single dispatch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub delivered: usize,
    pub failed: usize,
}

/// Ordered, name-unique set of reactions
pub struct EntryNotifier {
    reactions: RwLock<Vec<Arc<dyn EntryReaction>>>,
    metrics: Option<Arc<Metrics>>,
}

impl EntryNotifier {
    pub fn new() -> Self {
        Self { reactions: RwLock::new(Vec::new()), metrics: None }
    }

    pub fn with_metrics(metrics: Arc<Metrics>) -> Self {
        Self { reactions: RwLock::new(Vec::new()), metrics: Some(metrics) }
    }

    /// Register a reaction. Returns false if one with the same name is already registered.
    pub fn register(&self, reaction: Arc<dyn EntryReaction>) -> bool {
        let mut reactions = self.reactions.write();
        if reactions.iter().any(|r| Arc::ptr_eq(r, &reaction) || r.name() == reaction.name()) {
            debug!(reaction = %reaction.name(), "reaction_already_registered");
            return false;
        }
        info!(reaction = %reaction.name(), "reaction_registered");
        reactions.push(reaction);
        true
    }

    /// Remove a reaction by name. Returns false if it was not registered.
    pub fn unregister(&self, name: &str) -> bool {
        let mut reactions = self.reactions.write();
        let before = reactions.len();
        reactions.retain(|r| r.name() != name);
        let removed = reactions.len() != before;
        if removed {
            info!(reaction = %name, "reaction_unregistered");
        }
        removed
    }

    /// Deliver an event to every registered reaction
    pub fn dispatch(&self, event: &EntryEvent) -> DispatchSummary {
        // Snapshot so reactions may (un)register without deadlocking
        let reactions: Vec<Arc<dyn EntryReaction>> = self.reactions.read().clone();

        debug!(
            reactions = %reactions.len(),
            courier_id = %event.courier_id,
            store = %event.store.name,
            "entry_dispatch"
        );

        let mut summary = DispatchSummary::default();
        for reaction in &reactions {
            let result = panic::catch_unwind(AssertUnwindSafe(|| reaction.on_entry(event)));
            match result {
                Ok(Ok(())) => summary.delivered += 1,
                Ok(Err(e)) => {
                    summary.failed += 1;
                    error!(
                        reaction = %reaction.name(),
                        courier_id = %event.courier_id,
                        store = %event.store.name,
                        error = %format!("{e:#}"),
                        "reaction_failed"
                    );
                }
                Err(payload) => {
                    summary.failed += 1;
                    error!(
                        reaction = %reaction.name(),
                        courier_id = %event.courier_id,
                        store = %event.store.name,
                        panic = %panic_message(payload.as_ref()),
                        "reaction_panicked"
                    );
                }
            }
        }

        if let Some(ref metrics) = self.metrics {
            metrics.record_reaction_failures(summary.failed as u64);
        }

        summary
    }

    pub fn reaction_count(&self) -> usize {
        self.reactions.read().len()
    }

    pub fn reaction_names(&self) -> Vec<String> {
        self.reactions.read().iter().map(|r| r.name().to_string()).collect()
    }
}

impl Default for EntryNotifier {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
