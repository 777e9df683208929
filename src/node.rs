//! Device-level commands: reboot, shutdown and item updates.

use crate::commit::ChangeCommitter;
use crate::controller::ControllerGateway;
use crate::error::SyncError;
use std::collections::BTreeMap;
use tracing::info;

/// Commands addressed to the managed device as a whole
pub struct EdgeNode<'a> {
    committer: ChangeCommitter<'a, dyn ControllerGateway + 'a>,
}

impl<'a> EdgeNode<'a> {
    pub fn new(gateway: &'a dyn ControllerGateway) -> Self {
        Self {
            committer: ChangeCommitter::new(gateway),
        }
    }

    pub fn reboot(&self) -> Result<(), SyncError> {
        self.committer.apply("reboot", |session| {
            session.device_mut().reboot();
            Ok(())
        })?;
        info!("Reboot request has been sent");
        Ok(())
    }

    pub fn shutdown(&self) -> Result<(), SyncError> {
        self.committer.apply("shutdown", |session| {
            session.device_mut().shutdown();
            Ok(())
        })?;
        info!("Shutdown request has been sent");
        Ok(())
    }

    /// Set config items and device items in one commit.
    ///
    /// An unknown device item aborts the whole update.
    pub fn update_items(
        &self,
        device_items: &BTreeMap<String, String>,
        config_items: &BTreeMap<String, String>,
    ) -> Result<(), SyncError> {
        self.committer.apply("update_items", |session| {
            let device = session.device_mut();
            for (key, value) in config_items {
                device.set_config_item(key.as_str(), value.as_str());
            }
            for (key, value) in device_items {
                device.set_device_item(key, value)?;
            }
            Ok(())
        })?;
        info!(
            device_items = device_items.len(),
            config_items = config_items.len(),
            "Device items updated"
        );
        Ok(())
    }
}
