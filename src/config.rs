//! Configuration System
//!
//! Layered configuration for the sync job: defaults, an optional TOML file,
//! and `GROUPSYNC_*` environment variable overrides. Credentials and cache
//! behavior are explicit configuration rather than in-source constants, and
//! snapshot freshness is an explicit TTL.

use crate::error::SyncError;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default config file looked up next to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "groupsync.toml";

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Platform API access key
    #[serde(default)]
    pub access_key: String,

    /// Platform API secret key
    #[serde(default)]
    pub secret_key: String,

    /// Platform API base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Tag category owned by this tool
    #[serde(default = "default_category")]
    pub category: String,

    /// Fixed delay after each tag creation, in milliseconds
    #[serde(default = "default_create_delay_ms")]
    pub create_delay_ms: u64,

    /// Snapshot cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Snapshot cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Directory holding the snapshot files
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,

    /// Snapshot time-to-live in seconds (default: 24h, one refresh per day)
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_base_url() -> String {
    "https://cloud.tenable.com".to_string()
}

fn default_category() -> String {
    "Agent Groups".to_string()
}

fn default_create_delay_ms() -> u64 {
    1000
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(".groupsync/cache")
}

fn default_cache_ttl_secs() -> u64 {
    86400
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
            ttl_secs: default_cache_ttl_secs(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            access_key: String::new(),
            secret_key: String::new(),
            base_url: default_base_url(),
            category: default_category(),
            create_delay_ms: default_create_delay_ms(),
            cache: CacheConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl SyncConfig {
    /// Validate the configuration before a run.
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.access_key.is_empty() || self.secret_key.is_empty() {
            return Err(SyncError::ConfigError(
                "access_key and secret_key must be set (config file or \
                 GROUPSYNC_ACCESS_KEY / GROUPSYNC_SECRET_KEY)"
                    .to_string(),
            ));
        }
        if self.base_url.is_empty() {
            return Err(SyncError::ConfigError("base_url cannot be empty".to_string()));
        }
        if self.category.is_empty() {
            return Err(SyncError::ConfigError("category cannot be empty".to_string()));
        }
        Ok(())
    }
}

/// Loads configuration from file and environment sources.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with standard precedence: explicit file (or
    /// `groupsync.toml` when present) overridden by `GROUPSYNC_*` environment
    /// variables. Nested keys use `__`, e.g. `GROUPSYNC_CACHE__TTL_SECS`.
    pub fn load(config_path: Option<&Path>) -> Result<SyncConfig, SyncError> {
        let mut builder = config::Config::builder();

        match config_path {
            Some(path) => {
                builder = builder.add_source(
                    config::File::with_name(&path.to_string_lossy()).required(true),
                );
            }
            None => {
                builder = builder
                    .add_source(config::File::with_name(DEFAULT_CONFIG_FILE).required(false));
            }
        }

        builder = builder.add_source(
            config::Environment::with_prefix("GROUPSYNC")
                .prefix_separator("_")
                .separator("__"),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }
}
