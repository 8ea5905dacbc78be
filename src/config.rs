use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::host::types::HostType;

// =============================================================================
// Time-related constants
// =============================================================================

/// Default polling interval in milliseconds (15 minutes)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 15 * 60 * 1000;

/// Timeout for fetch operations in milliseconds (30 seconds)
pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 30_000;

/// Delay between starting each project check to avoid bursts (10ms)
pub const FETCH_STAGGER_DELAY_MS: u64 = 10;

/// Default number of projects checked concurrently
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Default GitHub rate limit safety buffer
pub const DEFAULT_RATE_LIMIT_BUFFER: i64 = 100;

/// Environment variable consulted when no GitHub token is configured
pub const GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing {0} auth token")]
    MissingToken(HostType),

    #[error("Failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to create HTTP client for {host_type}: {source}")]
    HttpClient {
        host_type: HostType,
        source: crate::host::error::ClientError,
    },

    #[error(transparent)]
    Registry(#[from] crate::host::error::RegistryError),
}

/// Monitor configuration structure
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct MonitorConfig {
    pub polling: PollingConfig,
    pub hosts: HostsConfig,
    pub notifications: NotificationConfig,
}

impl MonitorConfig {
    /// Loads configuration from `path`, or from the default location if present
    ///
    /// An explicit path must exist. Without one, a missing default file
    /// yields the built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let default_path = config_path();
                if !default_path.exists() {
                    return Ok(Self::default());
                }
                default_path
            }
        };

        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| ConfigError::Parse { path, source })
    }
}

/// Polling-related configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct PollingConfig {
    /// Time between polling cycles in milliseconds
    pub interval_ms: u64,
    /// Projects checked at the same time within one cycle
    pub concurrency: usize,
    /// Upper bound for a single remote call in milliseconds
    pub fetch_timeout_ms: u64,
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_POLL_INTERVAL_MS,
            concurrency: DEFAULT_CONCURRENCY,
            fetch_timeout_ms: DEFAULT_FETCH_TIMEOUT_MS,
        }
    }
}

/// Host-specific configuration
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct HostsConfig {
    pub github: GitHubConfig,
    pub npm: NpmConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct GitHubConfig {
    pub enabled: bool,
    pub token: Option<String>,
    pub rate_limit_buffer: i64,
    pub base_url: String,
    /// Responses kept for conditional requests; 0 disables the cache
    pub response_cache_size: usize,
}

impl GitHubConfig {
    /// Configured token, falling back to `GITHUB_TOKEN`
    pub fn token(&self) -> Option<String> {
        resolve_token(self.token.clone(), || std::env::var(GITHUB_TOKEN_ENV).ok())
    }
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            token: None,
            rate_limit_buffer: DEFAULT_RATE_LIMIT_BUFFER,
            base_url: crate::host::clients::github::DEFAULT_BASE_URL.to_string(),
            response_cache_size: crate::host::clients::github::DEFAULT_RESPONSE_CACHE_SIZE,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct NpmConfig {
    pub enabled: bool,
    pub base_url: String,
}

impl Default for NpmConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: crate::host::clients::npm::DEFAULT_BASE_URL.to_string(),
        }
    }
}

/// Notification-related configuration
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct NotificationConfig {
    /// Chat webhook receiving one message per new release
    pub webhook_url: Option<String>,
}

/// The environment is only consulted when no usable token is configured
fn resolve_token(
    configured: Option<String>,
    env: impl FnOnce() -> Option<String>,
) -> Option<String> {
    configured
        .filter(|t| !t.trim().is_empty())
        .or_else(|| env().filter(|t| !t.trim().is_empty()))
}

/// Returns the path to the data directory for release-monitor.
/// Uses $XDG_DATA_HOME/release-monitor if XDG_DATA_HOME is set,
/// otherwise falls back to ~/.local/share/release-monitor,
/// or ./release-monitor if neither is available.
pub fn data_dir() -> PathBuf {
    data_dir_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())
}

/// Returns the path to the database file.
pub fn db_path() -> PathBuf {
    data_dir().join("releases.db")
}

/// Returns the default path to the config file.
pub fn config_path() -> PathBuf {
    data_dir().join("config.json")
}

/// Returns the directory holding log files.
pub fn log_dir() -> PathBuf {
    data_dir().join("logs")
}

fn data_dir_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let data_dir = xdg_data_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));

    data_dir.join("release-monitor")
}
