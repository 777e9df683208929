//! Device desired state
//!
//! In-memory representation of one edge device's desired configuration as held
//! by the controller. A `DeviceState` is fetched whole, mutated in memory and
//! written back whole; there is no partial update.

use crate::error::SyncError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identifier of a versioned controller object
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UuidAndVersion {
    pub uuid: String,
    #[serde(default)]
    pub version: String,
}

impl UuidAndVersion {
    pub fn new(uuid: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            version: version.into(),
        }
    }
}

/// Base-OS image configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseOsConfig {
    pub uuidandversion: UuidAndVersion,
    pub base_os_version: String,
    pub content_tree_uuid: String,
    #[serde(default)]
    pub activate: bool,
}

impl BaseOsConfig {
    pub fn id(&self) -> &str {
        &self.uuidandversion.uuid
    }
}

/// Device-level settings with a closed set of keys
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceItems {
    #[serde(default)]
    pub global_profile: String,
    #[serde(default)]
    pub local_profile_server: String,
    #[serde(default)]
    pub profile_server_token: String,
    #[serde(default)]
    pub epoch: i64,
}

/// Desired state of the managed device
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceState {
    id: String,
    #[serde(default)]
    base_os_configs: Vec<BaseOsConfig>,
    #[serde(default)]
    base_os_activate: bool,
    #[serde(default)]
    base_os_content_tree: String,
    #[serde(default)]
    base_os_version: String,
    #[serde(default)]
    base_os_retry_counter: u32,
    #[serde(default)]
    config_items: BTreeMap<String, String>,
    #[serde(default)]
    device_items: DeviceItems,
    #[serde(default)]
    options: serde_json::Value,
    #[serde(default)]
    reboot_counter: u32,
    #[serde(default)]
    shutdown_counter: u32,
}

impl DeviceState {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Request a reboot on the next config poll
    pub fn reboot(&mut self) {
        self.reboot_counter = self.reboot_counter.saturating_add(1);
    }

    /// Request a shutdown on the next config poll
    pub fn shutdown(&mut self) {
        self.shutdown_counter = self.shutdown_counter.saturating_add(1);
    }

    pub fn reboot_counter(&self) -> u32 {
        self.reboot_counter
    }

    pub fn shutdown_counter(&self) -> u32 {
        self.shutdown_counter
    }

    pub fn attached_base_os_configs(&self) -> &[BaseOsConfig] {
        &self.base_os_configs
    }

    pub fn set_attached_base_os_configs(&mut self, configs: Vec<BaseOsConfig>) {
        self.base_os_configs = configs;
    }

    /// Index of an attached config by image id
    pub fn find_attached(&self, id: &str) -> Option<usize> {
        self.base_os_configs.iter().position(|c| c.id() == id)
    }

    pub fn base_os_activate(&self) -> bool {
        self.base_os_activate
    }

    pub fn set_base_os_activate(&mut self, activate: bool) {
        self.base_os_activate = activate;
    }

    pub fn base_os_content_tree(&self) -> &str {
        &self.base_os_content_tree
    }

    pub fn set_base_os_content_tree(&mut self, content_tree: impl Into<String>) {
        self.base_os_content_tree = content_tree.into();
    }

    pub fn base_os_version(&self) -> &str {
        &self.base_os_version
    }

    pub fn set_base_os_version(&mut self, version: impl Into<String>) {
        self.base_os_version = version.into();
    }

    pub fn base_os_retry_counter(&self) -> u32 {
        self.base_os_retry_counter
    }

    pub fn set_base_os_retry_counter(&mut self, counter: u32) {
        self.base_os_retry_counter = counter;
    }

    pub fn config_items(&self) -> &BTreeMap<String, String> {
        &self.config_items
    }

    pub fn set_config_item(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.config_items.insert(key.into(), value.into());
    }

    pub fn device_items(&self) -> &DeviceItems {
        &self.device_items
    }

    /// Set a device item by key.
    ///
    /// Only the keys of [`DeviceItems`] are accepted.
    pub fn set_device_item(&mut self, key: &str, value: &str) -> Result<(), SyncError> {
        match key {
            "global_profile" => self.device_items.global_profile = value.to_string(),
            "local_profile_server" => self.device_items.local_profile_server = value.to_string(),
            "profile_server_token" => self.device_items.profile_server_token = value.to_string(),
            "epoch" => {
                self.device_items.epoch = value.parse().map_err(|e| {
                    SyncError::Validation(format!("epoch must be an integer: {}", e))
                })?
            }
            _ => return Err(SyncError::UnknownDeviceItem(key.to_string())),
        }
        Ok(())
    }

    pub fn options(&self) -> &serde_json::Value {
        &self.options
    }

    pub fn set_options(&mut self, options: serde_json::Value) {
        self.options = options;
    }
}
