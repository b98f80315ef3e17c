//! Engine configuration loading and validation

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete engine configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RbacConfig {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub coordinator: CoordinatorConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    /// `memory` or `postgres`
    #[serde(default = "default_backend")]
    pub backend: String,
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            database_url: None,
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            acquire_timeout_secs: default_acquire_timeout(),
            idle_timeout_secs: default_idle_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CoordinatorConfig {
    /// Record every policy backend call in a resync journal
    #[serde(default = "default_true")]
    pub journal_enabled: bool,
    /// Re-add removed tuples when a rename cascade fails
    #[serde(default = "default_true")]
    pub compensate_on_cascade_failure: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            journal_enabled: true,
            compensate_on_cascade_failure: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Fallback filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_true")]
    pub with_target: bool,
    #[serde(default)]
    pub with_line_number: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            with_target: true,
            with_line_number: false,
        }
    }
}

// Default value functions
fn default_true() -> bool { true }
fn default_backend() -> String { "memory".to_string() }
fn default_max_connections() -> u32 { 25 }
fn default_min_connections() -> u32 { 5 }
fn default_acquire_timeout() -> u64 { 3 }
fn default_idle_timeout() -> u64 { 600 }
fn default_log_level() -> String { "info".to_string() }

impl RbacConfig {
    /// Load configuration from TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .context("Failed to read configuration file")?;

        Self::from_toml(&contents)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: RbacConfig =
            toml::from_str(contents).context("Failed to parse configuration file")?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        match self.store.backend.as_str() {
            "memory" => {}
            "postgres" => {
                if self.store.database_url.as_deref().map_or(true, str::is_empty) {
                    anyhow::bail!("database_url is required for the postgres backend");
                }
            }
            other => anyhow::bail!("Unknown store backend '{}'", other),
        }

        if self.store.max_connections == 0 {
            anyhow::bail!("max_connections must be greater than zero");
        }

        if self.store.min_connections > self.store.max_connections {
            anyhow::bail!("min_connections cannot exceed max_connections");
        }

        if self.coordinator.compensate_on_cascade_failure && !self.coordinator.journal_enabled {
            anyhow::bail!("compensate_on_cascade_failure requires journal_enabled");
        }

        Ok(())
    }
}
