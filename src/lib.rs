//! Edgesync: synchronization core for a single-device controller relay
//!
//! Stores device telemetry in an idempotent, timestamp-keyed file cache and
//! manages the device's desired state and base-OS images through
//! fetch, mutate, commit sessions against the controller.

pub mod commit;
pub mod config;
pub mod controller;
pub mod device;
pub mod error;
pub mod image;
pub mod logging;
pub mod node;
pub mod options;
pub mod telemetry;

pub use commit::{ChangeCommitter, Session};
pub use controller::{ControllerGateway, FileGateway, MemoryGateway};
pub use device::{BaseOsConfig, DeviceState, UuidAndVersion};
pub use error::{CacheError, GatewayError, SyncError};
pub use image::ImageLifecycleManager;
pub use node::EdgeNode;
pub use options::ConfigOptionsMediator;
pub use telemetry::{TelemetryCache, TelemetryKind};
