//! Merge rules: defaults, override order, conflict handling.

use crate::image::DEFAULT_VERSION_PATTERN;
use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
///
/// Path defaults depend on the platform and are filled in by serde instead.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("images.version_pattern", DEFAULT_VERSION_PATTERN)?
        .set_default("images.registry.ip", "127.0.0.1")?
        .set_default("images.registry.port", 5000)?
        .set_default("images.download_timeout_secs", 300)?
        .set_default("logging.level", "info")
}
