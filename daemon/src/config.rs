//! Daemon configuration with TOML file support.

use curation_types::{Address, GovernanceParams};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Read(#[from] std::io::Error),

    #[error("cannot parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("cannot serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid governance parameters: {0}")]
    Params(#[from] curation_types::CurationError),
}

/// Configuration for the curation daemon.
///
/// Loaded from a TOML file via [`DaemonConfig::from_toml_file`]; CLI flags
/// and environment variables override individual fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Directory holding the LMDB environment.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// LMDB memory map size in MiB.
    #[serde(default = "default_map_size_mb")]
    pub map_size_mb: usize,

    /// File registrations are appended to for the master registry to
    /// consume. Relative paths resolve against `data_dir`.
    #[serde(default = "default_registry_outbox")]
    pub registry_outbox: PathBuf,

    /// Addresses granted the admin role.
    #[serde(default)]
    pub admins: Vec<Address>,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Governance parameters; omitted keys keep the mainnet constants.
    #[serde(default)]
    pub params: GovernanceParams,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("./curation_data")
}

fn default_map_size_mb() -> usize {
    1024
}

fn default_registry_outbox() -> PathBuf {
    PathBuf::from("registry_outbox.jsonl")
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl DaemonConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.params.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn map_size_bytes(&self) -> usize {
        self.map_size_mb.saturating_mul(1024 * 1024)
    }

    pub fn registry_outbox_path(&self) -> PathBuf {
        if self.registry_outbox.is_absolute() {
            self.registry_outbox.clone()
        } else {
            self.data_dir.join(&self.registry_outbox)
        }
    }

    pub fn is_admin(&self, address: &Address) -> bool {
        self.admins.contains(address)
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            map_size_mb: default_map_size_mb(),
            registry_outbox: default_registry_outbox(),
            admins: Vec::new(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            params: GovernanceParams::default(),
        }
    }
}
