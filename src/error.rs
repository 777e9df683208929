//! Error types for the edge synchronization core.

use thiserror::Error;

/// Telemetry cache errors
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cannot decode {kind} payload: {message}")]
    Parse { kind: String, message: String },

    #[error("Missing timestamp in {kind} payload")]
    Schema { kind: String },

    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Controller gateway errors
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Controller connection failed: {0}")]
    Connection(String),

    #[error("Device not found: {0}")]
    NotFound(String),

    #[error("Controller transport error: {0}")]
    Transport(String),
}

/// Errors raised by state-mutating and mediating operations
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("Invalid document: {0}")]
    Validation(String),

    #[error("{0} scheme not supported")]
    UnsupportedScheme(String),

    #[error("Filename of rootfs {name} does not match pattern {pattern}")]
    PatternMismatch { name: String, pattern: String },

    #[error("Download failed: {0}")]
    Download(String),

    #[error("Cannot resolve image {image}: {message}")]
    Resolve { image: String, message: String },

    #[error("Unknown device item: {0}")]
    UnknownDeviceItem(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<config::ConfigError> for SyncError {
    fn from(err: config::ConfigError) -> Self {
        SyncError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Validation(err.to_string())
    }
}
