//! Base-OS image lifecycle: update, retry and remove.
//!
//! Each operation is one controller session. Reference parsing, downloads and
//! version resolution happen before the session opens, so a bad reference or
//! an unconventional file name aborts without touching the controller.

use crate::commit::ChangeCommitter;
use crate::controller::ControllerGateway;
use crate::device::{BaseOsConfig, DeviceState};
use crate::error::SyncError;
use crate::image::reference::{ArtifactFetcher, ImageReference, LocalArtifact};
use crate::image::resolver::{ImageResolver, RegistrySelection};
use crate::image::version::{resolve_version, VersionPattern};
use std::path::PathBuf;
use tracing::{debug, info};

/// Settings shared by all image operations
#[derive(Debug, Clone)]
pub struct ImageSettings {
    pub version_pattern: VersionPattern,
    pub registry_ip: String,
    pub registry_port: u16,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            version_pattern: VersionPattern::default(),
            registry_ip: "127.0.0.1".to_string(),
            registry_port: 5000,
        }
    }
}

/// Parameters of an image update
#[derive(Debug, Clone, Default)]
pub struct UpdateRequest {
    /// Image reference handed to the resolver
    pub image: String,
    /// Explicit version, empty to let the resolver decide
    pub version: String,
    /// `local`, `remote` or a registry address
    pub registry: String,
    /// Activate the new image once it is installed
    pub activate: bool,
    /// Attach the image as an additional drive instead of replacing the active one
    pub use_extra_drive: bool,
}

/// Parameters of an image removal
#[derive(Debug, Clone, Default)]
pub struct RemoveRequest {
    pub image: String,
    pub version: String,
    /// Directory downloads are staged under (in its `tmp` subdirectory)
    pub scratch_dir: PathBuf,
}

/// What a removal changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveOutcome {
    pub version: String,
    pub removed: Vec<String>,
    pub activated: Option<String>,
}

/// Manages the base-OS images attached to the device
pub struct ImageLifecycleManager<'a> {
    committer: ChangeCommitter<'a, dyn ControllerGateway + 'a>,
    resolver: &'a dyn ImageResolver,
    fetcher: &'a dyn ArtifactFetcher,
    settings: ImageSettings,
}

impl<'a> ImageLifecycleManager<'a> {
    pub fn new(
        gateway: &'a dyn ControllerGateway,
        resolver: &'a dyn ImageResolver,
        fetcher: &'a dyn ArtifactFetcher,
        settings: ImageSettings,
    ) -> Self {
        Self {
            committer: ChangeCommitter::new(gateway),
            resolver,
            fetcher,
            settings,
        }
    }

    /// Point the device at a new base-OS image
    pub fn update(&self, request: &UpdateRequest) -> Result<(), SyncError> {
        let registry = RegistrySelection::parse(&request.registry)
            .address(&self.settings.registry_ip, self.settings.registry_port);

        self.committer.apply("image_update", |session| {
            let resolved = self.resolver.resolve(
                session.controller(),
                session.device(),
                &request.image,
                &registry,
                &request.version,
            )?;
            let device = session.device_mut();

            let mut attached = device.attached_base_os_configs().to_vec();
            if request.use_extra_drive && device.find_attached(resolved.config.id()).is_none() {
                let mut config = resolved.config;
                config.activate = false;
                attached.push(config);
            }
            if let Some(active) = keep_single_active(&mut attached) {
                debug!(id = %active, "Keeping one active base OS image");
            }
            device.set_attached_base_os_configs(attached);

            if request.use_extra_drive {
                info!(image = %request.image, "Base OS image attached as extra drive");
            } else {
                device.set_base_os_content_tree(resolved.content_tree);
                device.set_base_os_retry_counter(0);
                device.set_base_os_activate(request.activate);
                device.set_base_os_version(resolved.version);
                info!(
                    image = %request.image,
                    version = device.base_os_version(),
                    activate = request.activate,
                    "Base OS image update requested"
                );
            }
            Ok(())
        })
    }

    /// Ask the device to retry the pending update
    pub fn retry(&self) -> Result<u32, SyncError> {
        self.committer.apply("image_retry", |session| {
            let device = session.device_mut();
            let counter = device.base_os_retry_counter().saturating_add(1);
            device.set_base_os_retry_counter(counter);
            info!(retry_counter = counter, "Base OS update retry requested");
            Ok(counter)
        })
    }

    /// Detach every image of a version and activate a replacement
    pub fn remove(&self, request: &RemoveRequest) -> Result<RemoveOutcome, SyncError> {
        let reference = ImageReference::parse(&request.image)?;
        // Held until the end of the call; a downloaded artifact is deleted on drop
        let artifact = LocalArtifact::resolve(&reference, &request.scratch_dir, self.fetcher)?;
        let version = resolve_version(
            &request.version,
            artifact.path(),
            &self.settings.version_pattern,
        )?;

        info!(version = %version, "Will use rootfs version");

        self.committer.apply("image_remove", |session| {
            let catalog = session.controller().list_base_os_catalog()?;
            Ok(detach_version(session.device_mut(), &catalog, &version))
        })
    }
}

/// Clear every activate flag after the first one, in attached order.
///
/// Returns the id of the entry left active, if any.
fn keep_single_active(attached: &mut [BaseOsConfig]) -> Option<String> {
    let mut active = None;
    for config in attached.iter_mut().filter(|c| c.activate) {
        if active.is_none() {
            active = Some(config.id().to_string());
        } else {
            config.activate = false;
        }
    }
    active
}

/// Remove attached images of `version` and pick the next active one.
///
/// All activate flags on attached images are cleared first. The replacement
/// is the first catalog entry, in catalog order, with a different version
/// that is attached to the device.
fn detach_version(
    device: &mut DeviceState,
    catalog: &[BaseOsConfig],
    version: &str,
) -> RemoveOutcome {
    let mut attached = device.attached_base_os_configs().to_vec();
    for config in attached.iter_mut() {
        config.activate = false;
    }

    let mut removed = Vec::new();
    let mut activated = None;
    for entry in catalog {
        if entry.base_os_version == version {
            if let Some(index) = attached.iter().position(|c| c.id() == entry.id()) {
                attached.remove(index);
                info!(id = entry.id(), "Base OS image removed");
                removed.push(entry.id().to_string());
            }
        } else if activated.is_none() {
            if let Some(config) = attached.iter_mut().find(|c| c.id() == entry.id()) {
                config.activate = true;
                info!(id = entry.id(), "Base OS image activated");
                activated = Some(entry.id().to_string());
            }
        }
    }

    device.set_attached_base_os_configs(attached);
    RemoveOutcome {
        version: version.to_string(),
        removed,
        activated,
    }
}
