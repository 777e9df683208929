//! Base-OS image management
//!
//! Reference parsing and scoped artifact handling, rootfs version resolution,
//! and the update / retry / remove operations built on controller sessions.

pub mod lifecycle;
pub mod reference;
pub mod resolver;
pub mod version;

pub use lifecycle::{
    ImageLifecycleManager, ImageSettings, RemoveOutcome, RemoveRequest, UpdateRequest,
};
pub use reference::{ArtifactFetcher, HttpFetcher, ImageReference, LocalArtifact};
pub use resolver::{ImageResolver, RegistrySelection, ResolvedImage};
pub use version::{resolve_version, VersionPattern, DEFAULT_VERSION_PATTERN};
