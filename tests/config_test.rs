//! Integration tests for configuration loading

use beacon_monitor::domain::Identifier;
use beacon_monitor::infra::Config;
use beacon_monitor::services::RegistrySettings;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_load_config_from_file() {
    let mut temp_file = NamedTempFile::new().unwrap();

    let config_content = r#"
[site]
id = "test-site"

[monitoring]
expiration_ms = 10000
sweep_interval_ms = 250

[persistence]
enabled = false
state_dir = "/var/lib/beacon-monitor"
blob_name = "lobby_state"

[egress]
file = "out/transitions.jsonl"

[metrics]
interval_secs = 15

[[regions]]
unique_id = "entrance"
identifiers = ["2f234454-cf6d-4a0f-adf2-f4911ba9ffa6", "1", "*"]

[[regions]]
unique_id = "kiosk"
bluetooth_address = "AA:BB:CC:DD:EE:FF"
"#;

    temp_file.write_all(config_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();

    assert_eq!(config.site_id(), "test-site");
    assert_eq!(config.expiration_ms(), 10_000);
    assert_eq!(config.sweep_interval_ms(), 250);
    assert!(!config.persistence_enabled());
    assert_eq!(config.blob_name(), "lobby_state");
    assert!(config.state_path().ends_with("lobby_state"));
    assert_eq!(config.egress_file(), "out/transitions.jsonl");
    assert_eq!(config.metrics_interval_secs(), 15);

    let regions = config.regions();
    assert_eq!(regions.len(), 2);
    assert_eq!(regions[0].unique_id(), "entrance");
    assert_eq!(regions[0].identifiers().len(), 3);
    assert_eq!(regions[0].identifiers()[1], Some(Identifier::from_u16(1)));
    assert!(regions[0].identifiers()[2].is_none());
    assert_eq!(regions[1].bluetooth_address(), Some("AA:BB:CC:DD:EE:FF"));

    let settings = RegistrySettings::from_config(&config);
    assert_eq!(settings.expiration_ms, 10_000);
    assert!(!settings.persistence_enabled);
    assert_eq!(settings.blob_name, "lobby_state");
}

#[test]
fn test_missing_sections_use_defaults() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"[site]\nid = \"minimal\"\n").unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();
    assert_eq!(config.site_id(), "minimal");
    assert_eq!(config.expiration_ms(), 30_000);
    assert!(config.persistence_enabled());
    assert_eq!(config.blob_name(), "beacon_monitoring_state");
    assert!(config.regions().is_empty());
}

#[test]
fn test_invalid_region_identifier_is_an_error() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file
        .write_all(b"[[regions]]\nunique_id = \"broken\"\nidentifiers = [\"not-an-id\"]\n")
        .unwrap();
    temp_file.flush().unwrap();

    assert!(Config::from_file(temp_file.path()).is_err());
    let fallback = Config::load_from_path(temp_file.path());
    assert_eq!(fallback.config_file(), "default");
}

#[test]
fn test_load_from_path_fallback() {
    let config = Config::load_from_path("/nonexistent/config.toml");
    assert_eq!(config.config_file(), "default");
    assert_eq!(config.expiration_ms(), 30_000);
    assert_eq!(config.sweep_interval_ms(), 1_000);
    assert!(config.persistence_enabled());
}
