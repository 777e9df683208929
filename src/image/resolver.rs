//! Image resolution seam
//!
//! Turning an image reference into a controller content tree and a base-OS
//! config is done by an external builder. The core only consumes its output.

use crate::controller::ControllerGateway;
use crate::device::{BaseOsConfig, DeviceState};
use crate::error::SyncError;

/// Output of image resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImage {
    /// Content tree the device should boot from
    pub content_tree: String,
    /// Version string recorded on the device
    pub version: String,
    /// Catalog entry describing the image
    pub config: BaseOsConfig,
}

/// Resolves image references against the controller
pub trait ImageResolver {
    fn resolve(
        &self,
        controller: &dyn ControllerGateway,
        device: &DeviceState,
        image: &str,
        registry: &str,
        version: &str,
    ) -> Result<ResolvedImage, SyncError>;
}

/// Where registry images are pulled from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrySelection {
    /// The relay's own registry at `ip:port`
    Local,
    /// The image's default upstream registry
    Remote,
    /// An explicit registry address
    Explicit(String),
}

impl RegistrySelection {
    pub fn parse(value: &str) -> Self {
        match value {
            "local" => RegistrySelection::Local,
            "remote" => RegistrySelection::Remote,
            other => RegistrySelection::Explicit(other.to_string()),
        }
    }

    /// Registry address handed to the resolver; empty means upstream
    pub fn address(&self, local_ip: &str, local_port: u16) -> String {
        match self {
            RegistrySelection::Local => format!("{}:{}", local_ip, local_port),
            RegistrySelection::Remote => String::new(),
            RegistrySelection::Explicit(address) => address.clone(),
        }
    }
}
