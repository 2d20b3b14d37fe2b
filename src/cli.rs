//! CLI definitions and user-facing error mapping. The tool is single-purpose,
//! so flags only; no subcommands.

use crate::error::SyncError;
use clap::Parser;
use std::path::PathBuf;

/// Sync scanner agent group membership onto asset tags
#[derive(Parser)]
#[command(name = "groupsync")]
#[command(about = "Mirror agent group membership onto asset tags in the owned category")]
pub struct Cli {
    /// Configuration file path (default: ./groupsync.toml when present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Bypass the snapshot cache and refresh inventories from the platform
    #[arg(long)]
    pub refresh: bool,

    /// Compute and log tag deltas without issuing any mutation
    #[arg(long)]
    pub dry_run: bool,

    /// Enable verbose logging
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, file, both)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

/// Map an error to a user-facing message for stderr.
pub fn map_error(error: &SyncError) -> String {
    match error {
        SyncError::AuthFailed(_) => {
            "Error: authentication failed. Check access_key and secret_key.".to_string()
        }
        SyncError::ConfigError(msg) => format!("Error: invalid configuration: {}", msg),
        SyncError::RateLimited(_) => {
            "Error: the platform is rate limiting requests. Re-run later.".to_string()
        }
        other => format!("Error: {}", other),
    }
}
