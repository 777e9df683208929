//! In-process controller
//!
//! Holds the device, catalog and options in memory. Used for embedding the core
//! without a remote controller and as the controller double in tests, so it
//! counts commits and can be told to fail the next commit.

use crate::controller::gateway::ControllerGateway;
use crate::device::{BaseOsConfig, DeviceState};
use crate::error::GatewayError;
use crate::options::schema::EdgeDevConfig;
use parking_lot::Mutex;
use std::collections::HashMap;

#[derive(Debug, Default)]
struct MemoryState {
    device: Option<DeviceState>,
    catalog: Vec<BaseOsConfig>,
    pushed_configs: HashMap<String, Vec<u8>>,
    global_options: serde_json::Value,
    fetches: usize,
    commits: usize,
    fail_next_commit: bool,
    offline: bool,
}

/// Controller kept in process memory
#[derive(Debug, Default)]
pub struct MemoryGateway {
    state: Mutex<MemoryState>,
}

impl MemoryGateway {
    pub fn new(device: DeviceState, catalog: Vec<BaseOsConfig>) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                device: Some(device),
                catalog,
                ..Default::default()
            }),
        }
    }

    /// Gateway with no onboarded device
    pub fn empty() -> Self {
        Self::default()
    }

    /// Currently stored device
    pub fn device(&self) -> Option<DeviceState> {
        self.state.lock().device.clone()
    }

    pub fn catalog(&self) -> Vec<BaseOsConfig> {
        self.state.lock().catalog.clone()
    }

    pub fn set_catalog(&self, catalog: Vec<BaseOsConfig>) {
        self.state.lock().catalog = catalog;
    }

    /// Last canonical config pushed for a device
    pub fn pushed_config(&self, device_id: &str) -> Option<Vec<u8>> {
        self.state.lock().pushed_configs.get(device_id).cloned()
    }

    pub fn fetch_count(&self) -> usize {
        self.state.lock().fetches
    }

    pub fn commit_count(&self) -> usize {
        self.state.lock().commits
    }

    /// Make the next commit fail with a transport error
    pub fn fail_next_commit(&self) {
        self.state.lock().fail_next_commit = true;
    }

    /// Simulate an unreachable controller
    pub fn set_offline(&self, offline: bool) {
        self.state.lock().offline = offline;
    }

    fn check_online(state: &MemoryState) -> Result<(), GatewayError> {
        if state.offline {
            return Err(GatewayError::Connection("controller offline".to_string()));
        }
        Ok(())
    }
}

impl ControllerGateway for MemoryGateway {
    fn fetch_current_device(&self) -> Result<DeviceState, GatewayError> {
        let mut state = self.state.lock();
        Self::check_online(&state)?;
        state.fetches += 1;
        state
            .device
            .clone()
            .ok_or_else(|| GatewayError::NotFound("no device onboarded".to_string()))
    }

    fn commit_device(&self, device: &DeviceState) -> Result<(), GatewayError> {
        let mut state = self.state.lock();
        if state.offline || std::mem::take(&mut state.fail_next_commit) {
            return Err(GatewayError::Transport("commit rejected".to_string()));
        }
        state.device = Some(device.clone());
        state.commits += 1;
        Ok(())
    }

    fn push_config(&self, device_id: &str, canonical: &[u8]) -> Result<(), GatewayError> {
        let mut state = self.state.lock();
        if state.offline {
            return Err(GatewayError::Transport("controller offline".to_string()));
        }
        state
            .pushed_configs
            .insert(device_id.to_string(), canonical.to_vec());
        Ok(())
    }

    fn list_base_os_catalog(&self) -> Result<Vec<BaseOsConfig>, GatewayError> {
        let state = self.state.lock();
        Self::check_online(&state)?;
        Ok(state.catalog.clone())
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
        let state = self.state.lock();
        Self::check_online(&state)?;
        match &state.device {
            Some(device) if device.id() == device_id => Ok(device.options().clone()),
            _ => Err(GatewayError::NotFound(device_id.to_string())),
        }
    }

    fn set_device_options(
        &self,
        device_id: &str,
        options: &serde_json::Value,
    ) -> Result<(), GatewayError> {
        let mut state = self.state.lock();
        Self::check_online(&state)?;
        match state.device.as_mut() {
            Some(device) if device.id() == device_id => {
                device.set_options(options.clone());
                Ok(())
            }
            _ => Err(GatewayError::NotFound(device_id.to_string())),
        }
    }

    fn get_global_options(&self) -> Result<serde_json::Value, GatewayError> {
        let state = self.state.lock();
        Self::check_online(&state)?;
        Ok(state.global_options.clone())
    }

    fn set_global_options(&self, options: &serde_json::Value) -> Result<(), GatewayError> {
        let mut state = self.state.lock();
        Self::check_online(&state)?;
        state.global_options = options.clone();
        Ok(())
    }
}
