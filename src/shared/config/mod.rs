//! Durability layer configuration
//!
//! Configuration is built with [`DurabilityConfig::builder`], loaded from a TOML
//! file, or both. Environment variables override file values:
//!
//! - `CRADLESYNC_DB_PATH` - SQLite database file
//! - `CRADLESYNC_SERVER_URL` - base URL of the sync endpoint
//!
//! ```toml
//! database_path = "/var/lib/cradlesync/durability.db"
//! server_url = "https://sync.example.com"
//! reachability_debounce_ms = 1500
//! item_timeout_secs = 15
//! periodic_sync_secs = 300
//! snapshot_retention = 5
//!
//! [health]
//! max_pending_items = 100
//! stale_sync_days = 7
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default server URL
const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:3000";

const ENV_DB_PATH: &str = "CRADLESYNC_DB_PATH";
const ENV_SERVER_URL: &str = "CRADLESYNC_SERVER_URL";

/// Thresholds used by the health check
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HealthThresholds {
    /// Queue length above which sync is considered to be falling behind
    pub max_pending_items: usize,
    /// Days without a successful sync before warning
    pub stale_sync_days: i64,
    /// Storage footprint above which a warning is raised
    pub max_storage_bytes: u64,
    /// Days since the newest retained backup before warning
    pub stale_backup_days: i64,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            max_pending_items: 100,
            stale_sync_days: 7,
            max_storage_bytes: 50 * 1024 * 1024,
            stale_backup_days: 7,
        }
    }
}

/// Durability layer configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DurabilityConfig {
    /// SQLite database file
    pub database_path: PathBuf,
    /// Base URL of the sync endpoint
    pub server_url: String,
    /// Quiet period before a connectivity change is acted on
    pub reachability_debounce: Duration,
    /// Upper bound for a single item transmission
    pub item_timeout: Duration,
    /// Interval of the background sync timer, if any
    pub periodic_sync: Option<Duration>,
    /// Number of backups kept before the oldest is evicted
    pub snapshot_retention: usize,
    /// Health check thresholds
    pub health: HealthThresholds,
}

impl Default for DurabilityConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            server_url: DEFAULT_SERVER_URL.to_string(),
            reachability_debounce: Duration::from_millis(1500),
            item_timeout: Duration::from_secs(15),
            periodic_sync: Some(Duration::from_secs(300)),
            snapshot_retention: 5,
            health: HealthThresholds::default(),
        }
    }
}

/// On-disk representation; every field is optional so partial files work
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    database_path: Option<PathBuf>,
    server_url: Option<String>,
    reachability_debounce_ms: Option<u64>,
    item_timeout_secs: Option<u64>,
    periodic_sync_secs: Option<u64>,
    snapshot_retention: Option<usize>,
    health: Option<HealthThresholds>,
}

impl DurabilityConfig {
    /// Create a new DurabilityConfigBuilder
    pub fn builder() -> DurabilityConfigBuilder {
        DurabilityConfigBuilder::default()
    }

    /// Parse a TOML document
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))?;

        let mut builder = Self::builder();
        if let Some(path) = file.database_path {
            builder = builder.database_path(path);
        }
        if let Some(url) = file.server_url {
            builder = builder.server_url(url);
        }
        if let Some(ms) = file.reachability_debounce_ms {
            builder = builder.reachability_debounce(Duration::from_millis(ms));
        }
        if let Some(secs) = file.item_timeout_secs {
            builder = builder.item_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = file.periodic_sync_secs {
            // 0 disables the timer
            builder = builder.periodic_sync((secs > 0).then(|| Duration::from_secs(secs)));
        }
        if let Some(retention) = file.snapshot_retention {
            builder = builder.snapshot_retention(retention);
        }
        if let Some(health) = file.health {
            builder = builder.health(health);
        }
        builder.build()
    }

    /// Load a TOML file and apply environment overrides
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&contents)?.with_env_overrides()
    }

    /// Defaults with environment overrides applied
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overrides()
    }

    /// Apply `CRADLESYNC_*` environment overrides
    pub fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Ok(path) = std::env::var(ENV_DB_PATH) {
            self.database_path = PathBuf::from(path);
        }
        if let Ok(url) = std::env::var(ENV_SERVER_URL) {
            self.server_url = url;
        }
        self.validate()?;
        Ok(self)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.server_url.starts_with("http://") || self.server_url.starts_with("https://")) {
            return Err(ConfigError::InvalidUrl(self.server_url.clone()));
        }
        if self.reachability_debounce < Duration::from_secs(1) {
            return Err(ConfigError::InvalidValue {
                field: "reachability_debounce",
                reason: "quiet period must be at least one second".to_string(),
            });
        }
        if self.item_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "item_timeout",
                reason: "must be greater than zero".to_string(),
            });
        }
        if matches!(self.periodic_sync, Some(interval) if interval.is_zero()) {
            return Err(ConfigError::InvalidValue {
                field: "periodic_sync",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.snapshot_retention == 0 {
            return Err(ConfigError::InvalidValue {
                field: "snapshot_retention",
                reason: "at least one backup must be retained".to_string(),
            });
        }
        Ok(())
    }
}

/// Builder for DurabilityConfig
#[derive(Debug, Default)]
pub struct DurabilityConfigBuilder {
    database_path: Option<PathBuf>,
    server_url: Option<String>,
    reachability_debounce: Option<Duration>,
    item_timeout: Option<Duration>,
    periodic_sync: Option<Option<Duration>>,
    snapshot_retention: Option<usize>,
    health: Option<HealthThresholds>,
}

impl DurabilityConfigBuilder {
    /// Set the database file
    pub fn database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = Some(path.into());
        self
    }

    /// Set the server URL
    pub fn server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = Some(url.into());
        self
    }

    /// Set the reachability quiet period
    pub fn reachability_debounce(mut self, debounce: Duration) -> Self {
        self.reachability_debounce = Some(debounce);
        self
    }

    /// Set the per-item transmission timeout
    pub fn item_timeout(mut self, timeout: Duration) -> Self {
        self.item_timeout = Some(timeout);
        self
    }

    /// Set or disable the periodic sync timer
    pub fn periodic_sync(mut self, interval: Option<Duration>) -> Self {
        self.periodic_sync = Some(interval);
        self
    }

    /// Set the number of retained backups
    pub fn snapshot_retention(mut self, retention: usize) -> Self {
        self.snapshot_retention = Some(retention);
        self
    }

    /// Set the health check thresholds
    pub fn health(mut self, health: HealthThresholds) -> Self {
        self.health = Some(health);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<DurabilityConfig, ConfigError> {
        let defaults = DurabilityConfig::default();
        let config = DurabilityConfig {
            database_path: self.database_path.unwrap_or(defaults.database_path),
            server_url: self.server_url.unwrap_or(defaults.server_url),
            reachability_debounce: self
                .reachability_debounce
                .unwrap_or(defaults.reachability_debounce),
            item_timeout: self.item_timeout.unwrap_or(defaults.item_timeout),
            periodic_sync: self.periodic_sync.unwrap_or(defaults.periodic_sync),
            snapshot_retention: self.snapshot_retention.unwrap_or(defaults.snapshot_retention),
            health: self.health.unwrap_or(defaults.health),
        };
        config.validate()?;
        Ok(config)
    }
}

/// Platform-specific default location of the database file
fn default_database_path() -> PathBuf {
    let mut path = dirs::data_dir().unwrap_or_else(std::env::temp_dir);
    path.push("cradlesync");
    path.push("durability.db");
    path
}

/// Configuration errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
    #[error("failed to read config: {0}")]
    Read(String),
    #[error("failed to parse config: {0}")]
    Parse(String),
}
