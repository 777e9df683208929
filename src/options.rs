//! Config and options mediation
//!
//! Whole-document pushes and pulls between the caller and the controller:
//! the device config (validated against [`schema::EdgeDevConfig`]), per-device
//! options and controller-wide options. Options are free-form JSON and are
//! only checked for well-formedness.

pub mod schema;

use crate::commit::ChangeCommitter;
use crate::controller::ControllerGateway;
use crate::error::SyncError;
use schema::EdgeDevConfig;
use serde::Serialize;
use tracing::info;

/// Forwards config and options documents to the controller
pub struct ConfigOptionsMediator<'a> {
    committer: ChangeCommitter<'a, dyn ControllerGateway + 'a>,
}

impl<'a> ConfigOptionsMediator<'a> {
    pub fn new(gateway: &'a dyn ControllerGateway) -> Self {
        Self {
            committer: ChangeCommitter::new(gateway),
        }
    }

    /// Validate a JSON device config and push its canonical form.
    ///
    /// Nothing is sent if the payload does not decode against the schema.
    pub fn set_config(&self, payload: &[u8]) -> Result<(), SyncError> {
        let config = EdgeDevConfig::from_json(payload)?;
        let canonical = config.to_canonical()?;

        let device = self.committer.gateway().fetch_current_device()?;
        self.committer
            .gateway()
            .push_config(device.id(), &canonical)?;
        info!(device_id = device.id(), bytes = canonical.len(), "Config loaded");
        Ok(())
    }

    /// The current device config as rendered by the controller
    pub fn get_config(&self, pretty: bool) -> Result<Vec<u8>, SyncError> {
        let session = self.committer.begin()?;
        let bytes = session
            .controller()
            .fetch_config_bytes(session.device(), pretty)?;
        Ok(bytes)
    }

    pub fn get_options(&self) -> Result<serde_json::Value, SyncError> {
        let session = self.committer.begin()?;
        let options = session
            .controller()
            .get_device_options(session.device().id())?;
        Ok(options)
    }

    /// Replace the device options with a JSON document
    pub fn set_options(&self, payload: &[u8]) -> Result<(), SyncError> {
        let options = parse_document(payload)?;
        let session = self.committer.begin()?;
        session
            .controller()
            .set_device_options(session.device().id(), &options)?;
        info!(device_id = session.device().id(), "Options loaded");
        Ok(())
    }

    pub fn get_global_options(&self) -> Result<serde_json::Value, SyncError> {
        Ok(self.committer.gateway().get_global_options()?)
    }

    /// Replace the controller-wide options with a JSON document
    pub fn set_global_options(&self, payload: &[u8]) -> Result<(), SyncError> {
        let options = parse_document(payload)?;
        self.committer.gateway().set_global_options(&options)?;
        info!("Global options loaded");
        Ok(())
    }
}

fn parse_document(payload: &[u8]) -> Result<serde_json::Value, SyncError> {
    serde_json::from_slice(payload)
        .map_err(|e| SyncError::Validation(format!("cannot unmarshal: {}", e)))
}

/// Pretty-print a document with a four-space indent
pub fn render_document(document: &serde_json::Value) -> Result<String, SyncError> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    document.serialize(&mut serializer)?;
    String::from_utf8(out).map_err(|e| SyncError::Validation(e.to_string()))
}
