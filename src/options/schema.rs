//! Device config schema
//!
//! The document a device receives from the controller. Pushed configs are
//! decoded against this schema (JSON, unknown fields rejected) and re-encoded
//! to the canonical binary form before they reach the controller.

use crate::device::{BaseOsConfig, DeviceState, UuidAndVersion};
use crate::error::SyncError;
use serde::{Deserialize, Serialize};

/// A key/value config item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigItem {
    pub key: String,
    #[serde(default)]
    pub value: String,
}

/// Counter-driven device command (reboot, shutdown, update retry)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DeviceOpsCmd {
    #[serde(default)]
    pub counter: u32,
    #[serde(default)]
    pub desired_state: bool,
    #[serde(default)]
    pub ops_time: String,
}

/// Currently requested base OS
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BaseOs {
    #[serde(default)]
    pub content_tree_uuid: String,
    #[serde(default)]
    pub base_os_version: String,
    #[serde(default)]
    pub activate: bool,
    #[serde(default)]
    pub retry_update: Option<DeviceOpsCmd>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AppInstanceConfig {
    pub uuidandversion: UuidAndVersion,
    #[serde(default)]
    pub displayname: String,
    #[serde(default)]
    pub activate: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NetworkConfig {
    pub id: String,
    #[serde(default, rename = "type")]
    pub network_type: String,
}

/// Full device config
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EdgeDevConfig {
    pub id: UuidAndVersion,
    #[serde(default)]
    pub config_items: Vec<ConfigItem>,
    #[serde(default)]
    pub base: Vec<BaseOsConfig>,
    #[serde(default)]
    pub baseos: Option<BaseOs>,
    #[serde(default)]
    pub reboot: Option<DeviceOpsCmd>,
    #[serde(default)]
    pub shutdown: Option<DeviceOpsCmd>,
    #[serde(default)]
    pub apps: Vec<AppInstanceConfig>,
    #[serde(default)]
    pub networks: Vec<NetworkConfig>,
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub global_profile: String,
    #[serde(default)]
    pub local_profile_server: String,
    #[serde(default)]
    pub profile_server_token: String,
    #[serde(default)]
    pub epoch: i64,
}

impl EdgeDevConfig {
    /// Decode a JSON document, rejecting anything outside the schema
    pub fn from_json(payload: &[u8]) -> Result<Self, SyncError> {
        serde_json::from_slice(payload)
            .map_err(|e| SyncError::Validation(format!("cannot unmarshal config: {}", e)))
    }

    /// Canonical binary encoding sent to the controller
    pub fn to_canonical(&self) -> Result<Vec<u8>, SyncError> {
        bincode::serialize(self)
            .map_err(|e| SyncError::Validation(format!("cannot marshal config: {}", e)))
    }

    pub fn from_canonical(bytes: &[u8]) -> Result<Self, SyncError> {
        bincode::deserialize(bytes)
            .map_err(|e| SyncError::Validation(format!("cannot decode canonical config: {}", e)))
    }

    /// Render the config a device would receive for `device`
    pub fn from_device(device: &DeviceState) -> Self {
        let items = device.device_items();
        Self {
            id: UuidAndVersion::new(device.id(), "1"),
            config_items: device
                .config_items()
                .iter()
                .map(|(key, value)| ConfigItem {
                    key: key.clone(),
                    value: value.clone(),
                })
                .collect(),
            base: device.attached_base_os_configs().to_vec(),
            baseos: Some(BaseOs {
                content_tree_uuid: device.base_os_content_tree().to_string(),
                base_os_version: device.base_os_version().to_string(),
                activate: device.base_os_activate(),
                retry_update: Some(DeviceOpsCmd {
                    counter: device.base_os_retry_counter(),
                    ..Default::default()
                }),
            }),
            reboot: Some(DeviceOpsCmd {
                counter: device.reboot_counter(),
                desired_state: true,
                ..Default::default()
            }),
            shutdown: Some(DeviceOpsCmd {
                counter: device.shutdown_counter(),
                ..Default::default()
            }),
            apps: Vec::new(),
            networks: Vec::new(),
            product_name: String::new(),
            global_profile: items.global_profile.clone(),
            local_profile_server: items.local_profile_server.clone(),
            profile_server_token: items.profile_server_token.clone(),
            epoch: items.epoch,
        }
    }
}
