//! Configuration loading: TOML file, then environment overrides

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Connection settings for the property hub
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    /// Per-request timeout
    pub timeout_secs: u64,
    /// Page size used when draining the hub
    pub page_size: u32,
    /// Upper bound on pages pulled for a single query
    pub max_pages: u32,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
            api_key: None,
            timeout_secs: 10,
            page_size: 100,
            max_pages: 200,
        }
    }
}

/// SQLite settings for the overlay store
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Database file, or `:memory:`
    pub path: PathBuf,
    pub wal_mode: bool,
    pub busy_timeout_ms: u32,
}

impl StoreConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn memory() -> Self {
        Self {
            path: PathBuf::from(":memory:"),
            wal_mode: false,
            ..Self::default()
        }
    }

    pub fn is_memory(&self) -> bool {
        self.path.to_str() == Some(":memory:")
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("overlay.db"),
            wal_mode: true,
            busy_timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Top-level application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub hub: HubConfig,
    pub store: StoreConfig,
    pub log: LogConfig,
}

impl AppConfig {
    /// Load from `path` if given (missing file is an error), otherwise defaults.
    /// Environment variables win over both.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file {}", path.display()))?;
                Self::from_toml(&raw)
                    .with_context(|| format!("Invalid config file {}", path.display()))?
            }
            None => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        debug!(hub = %config.hub.base_url, store = ?config.store.path, "Configuration loaded");
        Ok(config)
    }

    /// Parse a config file body; missing sections take defaults
    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("OVERLAY_HUB_URL") {
            self.hub.base_url = url;
        }
        if let Some(key) = lookup("OVERLAY_HUB_API_KEY") {
            self.hub.api_key = Some(key);
        }
        if let Some(path) = lookup("OVERLAY_DB_PATH") {
            self.store.path = PathBuf::from(path);
        }
        if let Some(level) = lookup("OVERLAY_LOG") {
            self.log.level = level;
        }
    }

    /// Reject paging and timeout values that would stall or loop
    pub fn validate(&self) -> Result<()> {
        if self.hub.page_size == 0 {
            bail!("hub.page_size must be at least 1");
        }
        if self.hub.max_pages == 0 {
            bail!("hub.max_pages must be at least 1");
        }
        if self.hub.timeout_secs == 0 {
            bail!("hub.timeout_secs must be at least 1");
        }
        Ok(())
    }
}
