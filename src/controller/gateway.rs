//! Controller gateway trait
//!
//! The remote store of per-device desired state and of the base-OS catalog.
//! Transports implement this trait; the core never talks to the network itself.

use crate::device::{BaseOsConfig, DeviceState};
use crate::error::GatewayError;

/// Access to the controller holding the device's desired state
pub trait ControllerGateway {
    /// Fetch a fresh snapshot of the current device
    fn fetch_current_device(&self) -> Result<DeviceState, GatewayError>;

    /// Replace the stored device state with `device`
    fn commit_device(&self, device: &DeviceState) -> Result<(), GatewayError>;

    /// Push a canonical binary device config
    fn push_config(&self, device_id: &str, canonical: &[u8]) -> Result<(), GatewayError>;

    /// The controller-wide base-OS catalog, in catalog order
    fn list_base_os_catalog(&self) -> Result<Vec<BaseOsConfig>, GatewayError>;

    /// The device config as the device would receive it, JSON encoded
    fn fetch_config_bytes(&self, device: &DeviceState, pretty: bool)
        -> Result<Vec<u8>, GatewayError>;

    fn get_device_options(&self, device_id: &str) -> Result<serde_json::Value, GatewayError>;

    fn set_device_options(
        &self,
        device_id: &str,
        options: &serde_json::Value,
    ) -> Result<(), GatewayError>;

    fn get_global_options(&self) -> Result<serde_json::Value, GatewayError>;

    fn set_global_options(&self, options: &serde_json::Value) -> Result<(), GatewayError>;
}
