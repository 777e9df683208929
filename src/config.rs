//! Configuration System
//!
//! Layered runtime configuration for the relay core: cache location, image
//! handling and logging. Sources are merged by [`ConfigLoader`] in increasing
//! precedence: built-in defaults, the user config file, workspace config files,
//! then `EDGESYNC__*` environment variables.

use crate::error::SyncError;
use crate::image::{HttpFetcher, ImageSettings, VersionPattern, DEFAULT_VERSION_PATTERN};
use crate::logging::LoggingConfig;
use crate::telemetry::TelemetryCache;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Telemetry cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Base-OS image settings
    #[serde(default)]
    pub images: ImagesConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Root of the telemetry directory tree
    #[serde(default = "default_cache_dir")]
    pub base_dir: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            base_dir: default_cache_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagesConfig {
    /// Where downloads are staged
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,

    /// Pattern rootfs versions derived from file names must match
    #[serde(default = "default_version_pattern")]
    pub version_pattern: String,

    /// Local registry used when an update asks for `local`
    #[serde(default)]
    pub registry: RegistryConfig,

    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            scratch_dir: default_scratch_dir(),
            version_pattern: default_version_pattern(),
            registry: RegistryConfig::default(),
            download_timeout_secs: default_download_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default = "default_registry_ip")]
    pub ip: String,
    #[serde(default = "default_registry_port")]
    pub port: u16,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            ip: default_registry_ip(),
            port: default_registry_port(),
        }
    }
}

fn data_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "edgesync")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".edgesync"))
}

fn default_cache_dir() -> PathBuf {
    data_dir().join("cache")
}

fn default_scratch_dir() -> PathBuf {
    data_dir().join("scratch")
}

fn default_version_pattern() -> String {
    DEFAULT_VERSION_PATTERN.to_string()
}

fn default_download_timeout_secs() -> u64 {
    300
}

fn default_registry_ip() -> String {
    "127.0.0.1".to_string()
}

fn default_registry_port() -> u16 {
    5000
}

/// Configuration validation errors
#[derive(Debug, Clone)]
pub enum ValidationError {
    Cache(String),
    Images(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Cache(msg) => write!(f, "Cache: {}", msg),
            ValidationError::Images(msg) => write!(f, "Images: {}", msg),
            ValidationError::Logging(msg) => write!(f, "Logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl RelayConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.cache.base_dir.as_os_str().is_empty() {
            errors.push(ValidationError::Cache("base_dir cannot be empty".to_string()));
        }
        if self.images.scratch_dir.as_os_str().is_empty() {
            errors.push(ValidationError::Images("scratch_dir cannot be empty".to_string()));
        }
        if let Err(e) = VersionPattern::new(&self.images.version_pattern) {
            errors.push(ValidationError::Images(e.to_string()));
        }
        if self.images.download_timeout_secs == 0 {
            errors.push(ValidationError::Images(
                "download_timeout_secs must be positive".to_string(),
            ));
        }
        if let Err(e) = crate::logging::validate(&self.logging) {
            errors.push(ValidationError::Logging(e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate and fold the errors into one
    pub fn ensure_valid(&self) -> Result<(), SyncError> {
        self.validate().map_err(|errors| {
            let msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            SyncError::Config(format!(
                "Configuration validation failed:\n{}",
                msgs.join("\n")
            ))
        })
    }

    pub fn telemetry_cache(&self) -> TelemetryCache {
        TelemetryCache::new(&self.cache.base_dir)
    }

    pub fn image_settings(&self) -> Result<ImageSettings, SyncError> {
        Ok(ImageSettings {
            version_pattern: VersionPattern::new(&self.images.version_pattern)?,
            registry_ip: self.images.registry.ip.clone(),
            registry_port: self.images.registry.port,
        })
    }

    pub fn http_fetcher(&self) -> Result<HttpFetcher, SyncError> {
        HttpFetcher::new(Duration::from_secs(self.images.download_timeout_secs))
    }
}
