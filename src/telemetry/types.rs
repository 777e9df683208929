//! Telemetry record kinds, payload schemas and timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use std::fmt;

/// Kind of record a device reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TelemetryKind {
    Log,
    Info,
    Metric,
}

impl TelemetryKind {
    pub const ALL: [TelemetryKind; 3] = [
        TelemetryKind::Log,
        TelemetryKind::Info,
        TelemetryKind::Metric,
    ];

    /// Directory name used under a device's cache directory
    pub fn dir_name(&self) -> &'static str {
        match self {
            TelemetryKind::Log => "logs",
            TelemetryKind::Info => "info",
            TelemetryKind::Metric => "metrics",
        }
    }

    /// Decode a raw payload and extract its canonical timestamp.
    ///
    /// Returns `Ok(None)` when the payload decodes but carries no timestamp.
    pub fn decode_timestamp(&self, raw: &[u8]) -> Result<Option<RecordTimestamp>, serde_json::Error> {
        match self {
            TelemetryKind::Log => {
                let bundle: LogBundle = serde_json::from_slice(raw)?;
                Ok(bundle.timestamp)
            }
            TelemetryKind::Info => {
                let msg: ZInfoMsg = serde_json::from_slice(raw)?;
                Ok(msg.at_time_stamp)
            }
            TelemetryKind::Metric => {
                let msg: ZMetricMsg = serde_json::from_slice(raw)?;
                Ok(msg.at_time_stamp)
            }
        }
    }
}

impl fmt::Display for TelemetryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TelemetryKind::Log => "log",
            TelemetryKind::Info => "info",
            TelemetryKind::Metric => "metric",
        };
        f.write_str(name)
    }
}

const NANOS_PER_SECOND: u32 = 1_000_000_000;

/// Seconds and nanoseconds since the Unix epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordTimestamp {
    pub seconds: i64,
    pub nanos: u32,
}

impl RecordTimestamp {
    pub fn new(seconds: i64, nanos: u32) -> Self {
        Self { seconds, nanos }
    }

    /// Storage key: `{seconds}:{nanos}` with nanos zero-padded to 9 digits
    pub fn storage_key(&self) -> String {
        format!("{}:{:09}", self.seconds, self.nanos)
    }

    /// Parse a storage key produced by [`RecordTimestamp::storage_key`]
    pub fn from_storage_key(key: &str) -> Option<Self> {
        let (seconds, nanos) = key.split_once(':')?;
        if nanos.len() != 9 {
            return None;
        }
        Some(Self {
            seconds: seconds.parse().ok()?,
            nanos: nanos.parse().ok()?,
        })
    }
}

impl From<DateTime<Utc>> for RecordTimestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Self {
            seconds: value.timestamp(),
            nanos: value.timestamp_subsec_nanos(),
        }
    }
}

// Protobuf JSON encodes Timestamp as an RFC 3339 string.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<RecordTimestamp>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(text) => {
            let ts = DateTime::parse_from_rfc3339(&text)
                .map(|dt| RecordTimestamp::from(dt.with_timezone(&Utc)))
                .map_err(|e| {
                    serde::de::Error::custom(format!("invalid timestamp {:?}: {}", text, e))
                })?;
            // chrono reports a leap second as nanos past one second
            if ts.nanos >= NANOS_PER_SECOND {
                return Err(serde::de::Error::custom(format!(
                    "invalid timestamp {:?}: leap seconds are not supported",
                    text
                )));
            }
            Ok(Some(ts))
        }
    }
}

/// Bundle of log entries sent by a device
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogBundle {
    #[serde(default, alias = "dev_id")]
    pub dev_id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub timestamp: Option<RecordTimestamp>,
    #[serde(default)]
    pub log: Vec<serde_json::Value>,
}

/// Device info message
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZInfoMsg {
    #[serde(default, alias = "dev_id")]
    pub dev_id: Option<String>,
    #[serde(default)]
    pub ztype: Option<serde_json::Value>,
    #[serde(default, alias = "at_time_stamp", deserialize_with = "deserialize_timestamp")]
    pub at_time_stamp: Option<RecordTimestamp>,
}

/// Device metrics message
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZMetricMsg {
    #[serde(default, alias = "devID")]
    pub dev_id: Option<String>,
    #[serde(default, alias = "at_time_stamp", deserialize_with = "deserialize_timestamp")]
    pub at_time_stamp: Option<RecordTimestamp>,
}
