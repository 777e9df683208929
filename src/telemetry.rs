//! Telemetry domain: device-reported records and their file cache.

pub mod cache;
pub mod types;

pub use cache::{StoreOutcome, TelemetryCache};
pub use types::{LogBundle, RecordTimestamp, TelemetryKind, ZInfoMsg, ZMetricMsg};
