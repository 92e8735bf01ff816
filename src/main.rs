//! Courier tracker - position ingestion and store entry detection
//!
//! Accepts courier position reports over HTTP, keeps per-courier history,
//! and records when a courier enters a store's radius.
//!
//! Module structure:
//! - `domain/` - Core business types (positions, stores, entries, errors)
//! - `io/` - External interfaces (HTTP API, entry journal, store seeding)
//! - `services/` - Business logic (tracking, proximity, distance, notifier)
//! - `infra/` - Infrastructure (Config, Metrics, Storage)

use clap::Parser;
use courier_tracker::infra::{
    Config, MemoryEntryStore, MemoryLocationStore, MemoryStoreCatalog, Metrics,
};
use courier_tracker::io::{seed_catalog, start_api_server, ApiState, EgressReaction};
use courier_tracker::services::{
    EntryNotifier, EntryQueryService, LoggingReaction, MetricSelector, PersistenceReaction,
    TrackingService,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Courier tracker - store entry detection service
#[derive(Parser, Debug)]
#[command(name = "courier-tracker", version, about)]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "config/dev.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Default: INFO, use RUST_LOG=debug for per-request detail
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    info!(git_hash = %env!("GIT_HASH"), "courier-tracker starting");

    let args = Args::parse();
    let config = Config::load_from_path(&args.config);

    info!(
        config_file = %config.config_file(),
        site = %config.site_id(),
        bind_address = %config.bind_address(),
        port = %config.port(),
        metric = %config.metric().as_str(),
        store_radius_m = %config.store_radius_meters(),
        reentry_cooldown_secs = %config.reentry_cooldown_secs(),
        seed_file = %config.seed_file(),
        egress_enabled = %config.egress_enabled(),
        "config_loaded"
    );

    // Storage
    let locations = Arc::new(MemoryLocationStore::new());
    let catalog = Arc::new(MemoryStoreCatalog::new());
    let entries = Arc::new(MemoryEntryStore::new());

    if let Err(e) = seed_catalog(catalog.as_ref(), config.seed_file()) {
        error!(file = %config.seed_file(), error = %e, "store_seed_failed");
        return Err(e.into());
    }

    let metrics = Arc::new(Metrics::new());
    let selector = Arc::new(MetricSelector::from_kind(config.metric()));

    // Reactions run in registration order
    let notifier = Arc::new(EntryNotifier::with_metrics(metrics.clone()));
    notifier.register(Arc::new(LoggingReaction));
    notifier.register(Arc::new(PersistenceReaction::new(catalog.clone(), entries.clone())));
    if config.egress_enabled() {
        notifier.register(Arc::new(EgressReaction::new(config.egress_file())));
    }
    info!(reactions = ?notifier.reaction_names(), "notifier_ready");

    let tracking = Arc::new(
        TrackingService::new(
            locations,
            catalog.clone(),
            entries.clone(),
            selector,
            notifier,
            metrics.clone(),
        )
        .with_policy(config.proximity_policy()),
    );
    let state = Arc::new(ApiState {
        tracking,
        entries: Arc::new(EntryQueryService::new(entries, catalog)),
        metrics: metrics.clone(),
        site_id: config.site_id().to_string(),
    });

    // Create shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Start metrics reporter
    let metrics_interval = config.metrics_interval_secs();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(metrics_interval));
        loop {
            interval.tick().await;
            metrics.report().log();
        }
    });

    // Handle shutdown on Ctrl+C
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown_signal_received");
        let _ = shutdown_tx.send(true);
    });

    let addr: SocketAddr = format!("{}:{}", config.bind_address(), config.port()).parse()?;
    if let Err(e) = start_api_server(addr, state, shutdown_rx).await {
        error!(addr = %addr, error = %e, "api_server_error");
        return Err(anyhow::anyhow!(e));
    }

    info!("courier-tracker shutdown complete");
    Ok(())
}
