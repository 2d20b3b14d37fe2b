//! Error types for the agent-group to asset-tag reconciler.

use thiserror::Error;

/// Errors surfaced by the sync pipeline
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("API request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("No tag registered for value '{0}'")]
    TagNotFound(String),

    #[error("Snapshot cache error: {0}")]
    Cache(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Serialization(err.to_string())
    }
}

impl From<config::ConfigError> for SyncError {
    fn from(err: config::ConfigError) -> Self {
        SyncError::ConfigError(err.to_string())
    }
}
