//! Deployment-local relay config under `<root>/config/`.
//!
//! `config.toml` applies to every deployment; `<EDGESYNC_ENV>.toml` (default
//! `development`) is layered on top of it.

use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, File};
use std::path::{Path, PathBuf};

const ENV_VAR: &str = "EDGESYNC_ENV";
const DEFAULT_ENV: &str = "development";

fn layer_paths(root: &Path) -> [PathBuf; 2] {
    let dir = root.join("config");
    let env_name = std::env::var(ENV_VAR).unwrap_or_else(|_| DEFAULT_ENV.to_string());
    [dir.join("config.toml"), dir.join(format!("{}.toml", env_name))]
}

pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    workspace_root: &Path,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Ok(layer_paths(workspace_root)
        .into_iter()
        .filter(|path| path.is_file())
        .fold(builder, |builder, path| builder.add_source(File::from(path))))
}
