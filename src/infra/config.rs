//! Configuration loading from TOML files
//!
//! The file path comes from the binary's `--config` argument. A missing or
//! invalid file falls back to defaults.

use crate::domain::{Identifier, Region};
use anyhow::Context;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Identifier placeholder that matches any value at its position
const WILDCARD: &str = "*";

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SiteConfig {
    /// Unique site identifier (e.g., "lobby", "warehouse")
    #[serde(default = "default_site_id")]
    pub id: String,
}

fn default_site_id() -> String {
    "beacon-monitor".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    /// Time without a sighting before an inside region flips to outside
    #[serde(default = "default_expiration_ms")]
    pub expiration_ms: u64,
    /// How often the expiry sweep runs
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            expiration_ms: default_expiration_ms(),
            sweep_interval_ms: default_sweep_interval_ms(),
        }
    }
}

fn default_expiration_ms() -> u64 {
    30_000
}

fn default_sweep_interval_ms() -> u64 {
    1_000
}

#[derive(Debug, Clone, Deserialize)]
pub struct PersistenceConfig {
    #[serde(default = "default_persistence_enabled")]
    pub enabled: bool,
    /// Directory holding the state blob
    #[serde(default = "default_state_dir")]
    pub state_dir: String,
    #[serde(default = "default_blob_name")]
    pub blob_name: String,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: default_persistence_enabled(),
            state_dir: default_state_dir(),
            blob_name: default_blob_name(),
        }
    }
}

fn default_persistence_enabled() -> bool {
    true
}

fn default_state_dir() -> String {
    "state".to_string()
}

pub fn default_blob_name() -> String {
    "beacon_monitoring_state".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct EgressConfig {
    /// File path for transition egress (JSONL format)
    #[serde(default = "default_egress_file")]
    pub file: String,
}

impl Default for EgressConfig {
    fn default() -> Self {
        Self { file: default_egress_file() }
    }
}

fn default_egress_file() -> String {
    "transitions.jsonl".to_string()
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
    10
}

/// A region definition as written in the config file
#[derive(Debug, Clone, Deserialize)]
pub struct RegionConfig {
    pub unique_id: String,
    /// Positional identifiers; "*" matches anything
    #[serde(default)]
    pub identifiers: Vec<String>,
    #[serde(default)]
    pub bluetooth_address: Option<String>,
}

impl RegionConfig {
    /// Build the domain region, parsing each identifier
    pub fn to_region(&self) -> anyhow::Result<Region> {
        let identifiers = self
            .identifiers
            .iter()
            .map(|raw| {
                if raw.trim() == WILDCARD {
                    Ok(None)
                } else {
                    raw.parse::<Identifier>().map(Some).with_context(|| {
                        format!("Invalid identifier {:?} in region {}", raw, self.unique_id)
                    })
                }
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        let region = Region::new(self.unique_id.clone(), identifiers);
        Ok(match self.bluetooth_address {
            Some(ref address) => region.with_bluetooth_address(address.clone()),
            None => region,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
    #[serde(default)]
    pub egress: EgressConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub regions: Vec<RegionConfig>,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    site_id: String,
    expiration_ms: u64,
    sweep_interval_ms: u64,
    persistence_enabled: bool,
    state_dir: String,
    blob_name: String,
    egress_file: String,
    metrics_interval_secs: u64,
    regions: Vec<Region>,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            site_id: default_site_id(),
            expiration_ms: default_expiration_ms(),
            sweep_interval_ms: default_sweep_interval_ms(),
            persistence_enabled: default_persistence_enabled(),
            state_dir: default_state_dir(),
            blob_name: default_blob_name(),
            egress_file: default_egress_file(),
            metrics_interval_secs: default_metrics_interval(),
            regions: Vec::new(),
            config_file: "default".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        let regions = toml_config
            .regions
            .iter()
            .map(RegionConfig::to_region)
            .collect::<anyhow::Result<Vec<_>>>()
            .with_context(|| format!("Invalid region in config file {}", path.display()))?;

        Ok(Self {
            site_id: toml_config.site.id,
            expiration_ms: toml_config.monitoring.expiration_ms,
            sweep_interval_ms: toml_config.monitoring.sweep_interval_ms,
            persistence_enabled: toml_config.persistence.enabled,
            state_dir: toml_config.persistence.state_dir,
            blob_name: toml_config.persistence.blob_name,
            egress_file: toml_config.egress.file,
            metrics_interval_secs: toml_config.metrics.interval_secs,
            regions,
            config_file: path.display().to_string(),
        })
    }

    /// Load configuration from a path, falling back to defaults on error
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %format!("{:#}", e), "config_load_failed_using_defaults");
                Self::default()
            }
        }
    }

    pub fn site_id(&self) -> &str {
        &self.site_id
    }

    pub fn expiration_ms(&self) -> u64 {
        self.expiration_ms
    }

    pub fn sweep_interval_ms(&self) -> u64 {
        self.sweep_interval_ms
    }

    pub fn persistence_enabled(&self) -> bool {
        self.persistence_enabled
    }

    pub fn state_dir(&self) -> &str {
        &self.state_dir
    }

    /// Full path of the state blob on disk
    pub fn state_path(&self) -> PathBuf {
        Path::new(&self.state_dir).join(&self.blob_name)
    }

    pub fn blob_name(&self) -> &str {
        &self.blob_name
    }

    pub fn egress_file(&self) -> &str {
        &self.egress_file
    }

    pub fn metrics_interval_secs(&self) -> u64 {
        self.metrics_interval_secs
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    /// Builder method for tests to set the expiration window
    #[cfg(test)]
    pub fn with_expiration_ms(mut self, ms: u64) -> Self {
        self.expiration_ms = ms;
        self
    }
}
