//! Integration tests for configuration loading

use courier_tracker::infra::config::MAX_REENTRY_COOLDOWN_SECS;
use courier_tracker::infra::Config;
use courier_tracker::services::MetricKind;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_load_config_from_file() {
    let mut temp_file = NamedTempFile::new().unwrap();

    let config_content = r#"
[site]
id = "test-site"

[server]
bind_address = "127.0.0.1"
port = 9090

[tracking]
metric = "planar"
store_radius_meters = 150.0
reentry_cooldown_secs = 120

[stores]
seed_file = "/data/stores.json"

[egress]
enabled = true
file = "/tmp/entries.jsonl"

[metrics]
interval_secs = 15
"#;

    temp_file.write_all(config_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();

    assert_eq!(config.site_id(), "test-site");
    assert_eq!(config.bind_address(), "127.0.0.1");
    assert_eq!(config.port(), 9090);
    assert_eq!(config.metric(), MetricKind::Planar);
    assert_eq!(config.store_radius_meters(), 150.0);
    assert_eq!(config.reentry_cooldown_secs(), 120);
    assert_eq!(config.seed_file(), "/data/stores.json");
    assert!(config.egress_enabled());
    assert_eq!(config.egress_file(), "/tmp/entries.jsonl");
    assert_eq!(config.metrics_interval_secs(), 15);

    let policy = config.proximity_policy();
    assert_eq!(policy.radius_meters, 150.0);
    assert_eq!(policy.cooldown, chrono::Duration::seconds(120));
}

#[test]
fn test_load_from_path_fallback() {
    let config = Config::load_from_path("/nonexistent/config.toml");
    assert_eq!(config.port(), 8080);
    assert_eq!(config.metric(), MetricKind::Haversine);
    assert_eq!(config.store_radius_meters(), 100.0);
    assert_eq!(config.config_file(), "default");
    assert_eq!(config.site_id(), "courier-tracker");
}

#[test]
fn test_rejects_non_positive_radius() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"[tracking]\nstore_radius_meters = 0.0\n").unwrap();
    temp_file.flush().unwrap();

    let err = Config::from_file(temp_file.path()).unwrap_err();
    assert!(err.to_string().contains("store_radius_meters"));
}

#[test]
fn test_rejects_out_of_range_cooldown() {
    for secs in ["-1", "31536001", "9223372036854775807"] {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "[tracking]\nreentry_cooldown_secs = {secs}\n").unwrap();
        temp_file.flush().unwrap();

        let err = Config::from_file(temp_file.path()).unwrap_err();
        assert!(err.to_string().contains("reentry_cooldown_secs"), "{secs}: {err}");
    }
}

#[test]
fn test_max_cooldown_builds_policy() {
    let mut temp_file = NamedTempFile::new().unwrap();
    write!(temp_file, "[tracking]\nreentry_cooldown_secs = {MAX_REENTRY_COOLDOWN_SECS}\n").unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();
    let policy = config.proximity_policy();
    assert_eq!(policy.cooldown, chrono::Duration::days(365));
}

#[test]
fn test_rejects_unknown_metric() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"[tracking]\nmetric = \"manhattan\"\n").unwrap();
    temp_file.flush().unwrap();

    assert!(Config::from_file(temp_file.path()).is_err());
}

#[test]
fn test_bundled_dev_config_parses() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/dev.toml");
    let config = Config::from_file(path).unwrap();
    assert_eq!(config.seed_file(), "config/stores.json");
}
