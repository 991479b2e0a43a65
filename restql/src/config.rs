//! Configuration for RESTQL.
//!
//! Config file resolution order for [`Config::load`]:
//! 1. RESTQL_CONFIG environment variable (path to a TOML file)
//! 2. `config.toml` in the platform config directory
//! 3. Built-in defaults

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "RESTQL_CONFIG";

/// Engine-wide defaults applied when a request leaves them out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Page size used when `limit` is not sent.
    #[serde(default = "default_limit")]
    pub default_limit: u64,

    /// Offset used when `offset` is not sent.
    #[serde(default)]
    pub default_offset: u64,

    /// Upper bound on `limit`; unbounded when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_limit: Option<u64>,

    /// Ordering used when an order-capable endpoint gets no `order`.
    #[serde(default = "default_order")]
    pub default_order: String,
}

fn default_limit() -> u64 {
    20
}

fn default_order() -> String {
    "id.asc".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            default_offset: 0,
            max_limit: None,
            default_order: default_order(),
        }
    }
}

impl Config {
    pub fn with_default_limit(mut self, limit: u64) -> Self {
        self.default_limit = limit;
        self
    }

    pub fn with_max_limit(mut self, limit: u64) -> Self {
        self.max_limit = Some(limit);
        self
    }

    pub fn with_default_order(mut self, order: impl Into<String>) -> Self {
        self.default_order = order.into();
        self
    }

    /// Load config using the standard resolution order.
    pub fn load() -> Result<Self> {
        match resolve_config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load config from a specific file, or defaults if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.check()?;
        Ok(config)
    }

    /// Save config to a specific file.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Check values a request could never satisfy.
    pub fn check(&self) -> Result<()> {
        if self.default_limit == 0 {
            return Err(Error::Config("default_limit must be at least 1".to_string()));
        }
        if let Some(max) = self.max_limit {
            if max < self.default_limit {
                return Err(Error::Config(format!(
                    "max_limit {} is below default_limit {}",
                    max, self.default_limit
                )));
            }
        }
        Ok(())
    }
}

/// Resolve the config file path, if there is one to look at.
fn resolve_config_path() -> Option<PathBuf> {
    // 1. Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        return Some(PathBuf::from(path));
    }

    // 2. Platform config directory
    ProjectDirs::from("", "", "restql").map(|dirs| dirs.config_dir().join("config.toml"))
}
