//! Configuration loading from TOML files
//!
//! The binary selects the file with `--config <path>` (default `config/dev.toml`).
//! A missing or invalid file falls back to defaults.

use crate::services::distance::MetricKind;
use crate::services::proximity::{ProximityPolicy, REENTRY_COOLDOWN_SECONDS, STORE_RADIUS_METERS};
use anyhow::{ensure, Context};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Upper bound for the re-entry cooldown (one year)
pub const MAX_REENTRY_COOLDOWN_SECS: i64 = 86_400 * 365;

#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Deployment identifier used as a metrics label
    #[serde(default = "default_site_id")]
    pub id: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self { id: default_site_id() }
    }
}

fn default_site_id() -> String {
    "courier-tracker".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind_address: default_bind_address(), port: default_port() }
    }
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackingConfig {
    #[serde(default)]
    pub metric: MetricKind,
    #[serde(default = "default_store_radius")]
    pub store_radius_meters: f64,
    #[serde(default = "default_cooldown_secs")]
    pub reentry_cooldown_secs: i64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            metric: MetricKind::default(),
            store_radius_meters: default_store_radius(),
            reentry_cooldown_secs: default_cooldown_secs(),
        }
    }
}

fn default_store_radius() -> f64 {
    STORE_RADIUS_METERS
}

fn default_cooldown_secs() -> i64 {
    REENTRY_COOLDOWN_SECONDS
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoresConfig {
    /// JSON file with the initial store list
    #[serde(default = "default_seed_file")]
    pub seed_file: String,
}

impl Default for StoresConfig {
    fn default() -> Self {
        Self { seed_file: default_seed_file() }
    }
}

fn default_seed_file() -> String {
    "config/stores.json".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct EgressConfig {
    /// Enable the JSONL entry journal
    #[serde(default)]
    pub enabled: bool,
    /// File path for the entry journal (JSONL format)
    #[serde(default = "default_egress_file")]
    pub file: String,
}

impl Default for EgressConfig {
    fn default() -> Self {
        Self { enabled: false, file: default_egress_file() }
    }
}

fn default_egress_file() -> String {
    "store_entries.jsonl".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_interval")]
    pub interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { interval_secs: default_metrics_interval() }
    }
}

fn default_metrics_interval() -> u64 {
    60
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub stores: StoresConfig,
    #[serde(default)]
    pub egress: EgressConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    site_id: String,
    bind_address: String,
    port: u16,
    metric: MetricKind,
    store_radius_meters: f64,
    reentry_cooldown_secs: i64,
    seed_file: String,
    egress_enabled: bool,
    egress_file: String,
    metrics_interval_secs: u64,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_toml(TomlConfig::default(), "default")
    }
}

impl Config {
    fn from_toml(toml_config: TomlConfig, config_file: &str) -> Self {
        Self {
            site_id: toml_config.site.id,
            bind_address: toml_config.server.bind_address,
            port: toml_config.server.port,
            metric: toml_config.tracking.metric,
            store_radius_meters: toml_config.tracking.store_radius_meters,
            reentry_cooldown_secs: toml_config.tracking.reentry_cooldown_secs,
            seed_file: toml_config.stores.seed_file,
            egress_enabled: toml_config.egress.enabled,
            egress_file: toml_config.egress.file,
            metrics_interval_secs: toml_config.metrics.interval_secs,
            config_file: config_file.to_string(),
        }
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        ensure!(
            toml_config.tracking.store_radius_meters > 0.0,
            "tracking.store_radius_meters must be positive in {}",
            path.display()
        );
        let cooldown_secs = toml_config.tracking.reentry_cooldown_secs;
        ensure!(
            (0..=MAX_REENTRY_COOLDOWN_SECS).contains(&cooldown_secs),
            "tracking.reentry_cooldown_secs must be within 0..={} in {}",
            MAX_REENTRY_COOLDOWN_SECS,
            path.display()
        );

        Ok(Self::from_toml(toml_config, &path.display().to_string()))
    }

    /// Load configuration - tries TOML file first, falls back to defaults
    pub fn load_from_path(path: &str) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Warning: {:#}. Using defaults.", e);
                Self::default()
            }
        }
    }

    /// Radius and cooldown policy for proximity detection
    pub fn proximity_policy(&self) -> ProximityPolicy {
        ProximityPolicy {
            radius_meters: self.store_radius_meters,
            cooldown: chrono::Duration::seconds(self.reentry_cooldown_secs),
        }
    }

    // Getters for all config fields
    pub fn site_id(&self) -> &str {
        &self.site_id
    }

    pub fn bind_address(&self) -> &str {
        &self.bind_address
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn metric(&self) -> MetricKind {
        self.metric
    }

    pub fn store_radius_meters(&self) -> f64 {
        self.store_radius_meters
    }

    pub fn reentry_cooldown_secs(&self) -> i64 {
        self.reentry_cooldown_secs
    }

    pub fn seed_file(&self) -> &str {
        &self.seed_file
    }

    pub fn egress_enabled(&self) -> bool {
        self.egress_enabled
    }

    pub fn egress_file(&self) -> &str {
        &self.egress_file
    }

    pub fn metrics_interval_secs(&self) -> u64 {
        self.metrics_interval_secs
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }
}
