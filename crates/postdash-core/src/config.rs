//! Dashboard configuration.
//!
//! Read from `<config_dir>/postdash/config.json`. A missing file yields the
//! defaults. `POSTDASH_API_URL` and `POSTDASH_EXPORT_DIR` override the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::query::{CacheConfig, RetryPolicy};

/// Name of the application directory under the platform config dir.
pub const APP_DIR: &str = "postdash";

/// Environment variable overriding [`Config::api_base_url`].
pub const API_URL_VAR: &str = "POSTDASH_API_URL";

/// Environment variable overriding [`Config::export_dir`].
pub const EXPORT_DIR_VAR: &str = "POSTDASH_EXPORT_DIR";

/// Backend used when nothing else is configured.
pub const DEFAULT_API_URL: &str = "http://localhost:3001/api";

/// Dashboard settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend API root.
    pub api_base_url: String,
    /// Seconds a cached response is served without refetching.
    pub stale_time_secs: u64,
    /// Seconds an unread cached response is kept before it is dropped.
    pub gc_time_secs: u64,
    /// Retries for reads that fail with a network error.
    pub max_retries: u32,
    /// Milliseconds before the first retry; later retries wait longer.
    pub retry_backoff_ms: u64,
    /// Where exports are written. Defaults to the download directory.
    pub export_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            stale_time_secs: 30,
            gc_time_secs: 300,
            max_retries: 2,
            retry_backoff_ms: 1000,
            export_dir: None,
        }
    }
}

impl Config {
    /// Loads the configuration file and applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Ok(Self::load_from(&config_path())?.with_overrides(|name| std::env::var(name).ok()))
    }

    /// Loads the configuration file at `path` without environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Applies overrides looked up by variable name.
    #[must_use]
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup(API_URL_VAR).filter(|v| !v.trim().is_empty()) {
            self.api_base_url = url;
        }
        if let Some(dir) = lookup(EXPORT_DIR_VAR).filter(|v| !v.trim().is_empty()) {
            self.export_dir = Some(PathBuf::from(dir));
        }
        self
    }

    /// Cache settings derived from this configuration.
    #[must_use]
    pub const fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            stale_time: Duration::from_secs(self.stale_time_secs),
            gc_time: Duration::from_secs(self.gc_time_secs),
            retry: RetryPolicy::new(
                self.max_retries,
                Duration::from_millis(self.retry_backoff_ms),
            ),
        }
    }

    /// Directory exports are written to.
    #[must_use]
    pub fn export_dir(&self) -> PathBuf {
        self.export_dir
            .clone()
            .or_else(dirs::download_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Application config directory.
#[must_use]
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Path of the configuration file.
#[must_use]
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

/// Path of the preferences file holding the reporting period.
#[must_use]
pub fn preferences_path() -> PathBuf {
    config_dir().join("preferences.json")
}
