//! Logging System
//!
//! Structured logging via the `tracing` crate. An unattended sync job wants
//! human-readable progress on stdout and a log file at the same time, so
//! "both" is the default output; level and format are overridable from the
//! config file, environment, or CLI.

use crate::error::SyncError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error, off
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: json, text (default: text)
    #[serde(default = "default_format")]
    pub format: String,

    /// Output destination: stdout, file, both
    #[serde(default = "default_output")]
    pub output: String,

    /// Log file path (if output includes "file")
    #[serde(default = "default_log_file")]
    pub file: PathBuf,

    /// Enable colored output (text format, stdout only)
    #[serde(default = "default_true")]
    pub color: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "text".to_string()
}

fn default_output() -> String {
    "both".to_string()
}

fn default_log_file() -> PathBuf {
    PathBuf::from("groupsync.log")
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_format(),
            output: default_output(),
            file: default_log_file(),
            color: default_true(),
        }
    }
}

/// Initialize the logging system.
///
/// Priority order (highest to lowest): `GROUPSYNC_LOG` environment filter,
/// then the supplied configuration, then defaults.
pub fn init_logging(config: Option<&LoggingConfig>) -> Result<(), SyncError> {
    let filter = build_env_filter(config);
    let format = determine_format(config)?;
    let output = determine_output(config)?;
    let use_color = config.map(|c| c.color).unwrap_or(true);

    let base_subscriber = Registry::default().with(filter);

    let file_writer = |cfg: Option<&LoggingConfig>| -> Result<std::fs::File, SyncError> {
        let log_file = cfg.map(|c| c.file.clone()).unwrap_or_else(default_log_file);
        if let Some(parent) = log_file.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    SyncError::ConfigError(format!("Failed to create log directory: {}", e))
                })?;
            }
        }
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .map_err(|e| {
                SyncError::ConfigError(format!("Failed to open log file {:?}: {}", log_file, e))
            })
    };

    if format == "json" {
        match output {
            Output::Stdout => base_subscriber
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_timer(ChronoUtc::rfc_3339())
                        .with_writer(std::io::stdout),
                )
                .init(),
            Output::File => base_subscriber
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_timer(ChronoUtc::rfc_3339())
                        .with_writer(file_writer(config)?),
                )
                .init(),
            Output::Both => base_subscriber
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_timer(ChronoUtc::rfc_3339())
                        .with_writer(std::io::stdout),
                )
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_timer(ChronoUtc::rfc_3339())
                        .with_writer(file_writer(config)?),
                )
                .init(),
        }
    } else {
        match output {
            Output::Stdout => base_subscriber
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_timer(ChronoUtc::rfc_3339())
                        .with_ansi(use_color)
                        .with_writer(std::io::stdout),
                )
                .init(),
            Output::File => base_subscriber
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_timer(ChronoUtc::rfc_3339())
                        .with_ansi(false)
                        .with_writer(file_writer(config)?),
                )
                .init(),
            Output::Both => base_subscriber
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_timer(ChronoUtc::rfc_3339())
                        .with_ansi(use_color)
                        .with_writer(std::io::stdout),
                )
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_timer(ChronoUtc::rfc_3339())
                        .with_ansi(false)
                        .with_writer(file_writer(config)?),
                )
                .init(),
        }
    }

    Ok(())
}

/// Build the level filter from `GROUPSYNC_LOG` or the configured level.
fn build_env_filter(config: Option<&LoggingConfig>) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_env("GROUPSYNC_LOG") {
        return filter;
    }
    let level = config.map(|c| c.level.as_str()).unwrap_or("info");
    EnvFilter::new(level)
}

fn determine_format(config: Option<&LoggingConfig>) -> Result<String, SyncError> {
    let format = config.map(|c| c.format.as_str()).unwrap_or("text");
    if format != "json" && format != "text" {
        return Err(SyncError::ConfigError(format!(
            "Invalid log format: {} (must be 'json' or 'text')",
            format
        )));
    }
    Ok(format.to_string())
}

enum Output {
    Stdout,
    File,
    Both,
}

fn determine_output(config: Option<&LoggingConfig>) -> Result<Output, SyncError> {
    match config.map(|c| c.output.as_str()).unwrap_or("both") {
        "stdout" => Ok(Output::Stdout),
        "file" => Ok(Output::File),
        "both" => Ok(Output::Both),
        other => Err(SyncError::ConfigError(format!(
            "Invalid log output: {} (must be 'stdout', 'file', or 'both')",
            other
        ))),
    }
}
