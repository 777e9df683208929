//! File-backed controller
//!
//! Keeps controller state as JSON documents in a directory:
//! - `device.json`: the current device's desired state
//! - `catalog.json`: the base-OS catalog (read only to this crate)
//! - `global_options.json`: controller-wide options
//! - `configs/{device_id}.bin`: last pushed canonical config
//!
//! Writes go through a temp file and a rename so a crash never leaves a
//! half-written document behind.

use crate::controller::gateway::ControllerGateway;
use crate::device::{BaseOsConfig, DeviceState};
use crate::error::GatewayError;
use crate::options::schema::EdgeDevConfig;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const DEVICE_FILE: &str = "device.json";
const CATALOG_FILE: &str = "catalog.json";
const GLOBAL_OPTIONS_FILE: &str = "global_options.json";
const CONFIGS_DIR: &str = "configs";

/// Controller state stored in a local directory
pub struct FileGateway {
    root: PathBuf,
}

impl FileGateway {
    /// Open a controller directory.
    ///
    /// Fails with `GatewayError::Connection` if the directory does not exist.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self, GatewayError> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(GatewayError::Connection(format!(
                "controller directory {} does not exist",
                root.display()
            )));
        }
        Ok(Self { root })
    }

    /// Create a controller directory seeded with a device and catalog
    pub fn init<P: AsRef<Path>>(
        root: P,
        device: &DeviceState,
        catalog: &[BaseOsConfig],
    ) -> Result<Self, GatewayError> {
        let root = root.as_ref();
        fs::create_dir_all(root).map_err(transport)?;
        let gateway = Self {
            root: root.to_path_buf(),
        };
        gateway.write_json(DEVICE_FILE, device)?;
        gateway.write_json(CATALOG_FILE, &catalog)?;
        Ok(gateway)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, GatewayError> {
        let path = self.root.join(name);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&path).map_err(transport)?;
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| GatewayError::Transport(format!("corrupt {}: {}", path.display(), e)))
    }

    fn write_json<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<(), GatewayError> {
        let bytes = serde_json::to_vec_pretty(value)
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        self.write_atomic(&self.root.join(name), &bytes)
    }

    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<(), GatewayError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(transport)?;
        }
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, bytes).map_err(transport)?;
        fs::rename(&temp_path, path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            transport(e)
        })?;
        debug!(path = %path.display(), "Controller document written");
        Ok(())
    }

    fn load_device(&self, device_id: &str) -> Result<DeviceState, GatewayError> {
        let device: DeviceState = self
            .read_json(DEVICE_FILE)?
            .ok_or_else(|| GatewayError::NotFound(device_id.to_string()))?;
        if device.id() != device_id {
            return Err(GatewayError::NotFound(device_id.to_string()));
        }
        Ok(device)
    }
}

fn transport(err: std::io::Error) -> GatewayError {
    GatewayError::Transport(err.to_string())
}

impl ControllerGateway for FileGateway {
    fn fetch_current_device(&self) -> Result<DeviceState, GatewayError> {
        self.read_json(DEVICE_FILE)?
            .ok_or_else(|| GatewayError::NotFound("no device onboarded".to_string()))
    }

    fn commit_device(&self, device: &DeviceState) -> Result<(), GatewayError> {
        self.write_json(DEVICE_FILE, device)
    }

    fn push_config(&self, device_id: &str, canonical: &[u8]) -> Result<(), GatewayError> {
        let path = self
            .root
            .join(CONFIGS_DIR)
            .join(format!("{}.bin", device_id));
        self.write_atomic(&path, canonical)
    }

    fn list_base_os_catalog(&self) -> Result<Vec<BaseOsConfig>, GatewayError> {
        Ok(self.read_json(CATALOG_FILE)?.unwrap_or_default())
    }

    fn fetch_config_bytes(
        &self,
        device: &DeviceState,
        pretty: bool,
    ) -> Result<Vec<u8>, GatewayError> {
        let config = EdgeDevConfig::from_device(device);
        let rendered = if pretty {
            serde_json::to_vec_pretty(&config)
        } else {
            serde_json::to_vec(&config)
        };
        rendered.map_err(|e| GatewayError::Transport(e.to_string()))
    }

    fn get_device_options(&self, device_id: &str) -> Result<serde_json::Value, GatewayError> {
        Ok(self.load_device(device_id)?.options().clone())
    }

    fn set_device_options(
        &self,
        device_id: &str,
        options: &serde_json::Value,
    ) -> Result<(), GatewayError> {
        let mut device = self.load_device(device_id)?;
        device.set_options(options.clone());
        self.write_json(DEVICE_FILE, &device)
    }

    fn get_global_options(&self) -> Result<serde_json::Value, GatewayError> {
        Ok(self
            .read_json(GLOBAL_OPTIONS_FILE)?
            .unwrap_or(serde_json::Value::Null))
    }

    fn set_global_options(&self, options: &serde_json::Value) -> Result<(), GatewayError> {
        self.write_json(GLOBAL_OPTIONS_FILE, options)
    }
}
