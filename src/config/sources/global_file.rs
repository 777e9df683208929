//! User-level relay config: `edgesync/config.toml` under the platform config dir.

use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, File};
use directories::BaseDirs;
use std::path::PathBuf;
use tracing::debug;

const RELAY_DIR: &str = "edgesync";
const FILE_NAME: &str = "config.toml";

/// Where the user-level relay config lives; honours `XDG_CONFIG_HOME`
pub fn global_config_path() -> Option<PathBuf> {
    let config_root = match std::env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        Some(xdg) => PathBuf::from(xdg),
        None => BaseDirs::new()?.config_dir().to_path_buf(),
    };
    Some(config_root.join(RELAY_DIR).join(FILE_NAME))
}

pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let Some(path) = global_config_path().filter(|p| p.is_file()) else {
        debug!("No user-level relay config");
        return Ok(builder);
    };
    let path = dunce::canonicalize(&path).unwrap_or(path);
    debug!(config_path = %path.display(), "Using user-level relay config");
    Ok(builder.add_source(File::from(path)))
}
