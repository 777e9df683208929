//! Telemetry file cache
//!
//! Persists device-reported records under a timestamp-keyed directory tree.
//! Records are stored at:
//! `{base}/{device_id}/{kind}/{seconds}:{nanos}`
//!
//! The first record written for a key wins. Later deliveries of the same key,
//! whatever their content, leave the stored file untouched, so at-least-once
//! delivery upstream collapses into a single stored copy.

use crate::error::CacheError;
use crate::telemetry::types::{RecordTimestamp, TelemetryKind};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Result of a [`TelemetryCache::store`] call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOutcome {
    /// Payload written to a new file
    Stored(PathBuf),
    /// A record with the same key already existed and was left as is
    Duplicate(PathBuf),
}

impl StoreOutcome {
    pub fn path(&self) -> &Path {
        match self {
            StoreOutcome::Stored(path) | StoreOutcome::Duplicate(path) => path,
        }
    }
}

/// Timestamp-keyed telemetry store
pub struct TelemetryCache {
    base_dir: PathBuf,
}

impl TelemetryCache {
    /// Create a cache rooted at `base_dir`.
    ///
    /// Directories are created lazily on the first store.
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Directory holding all records of one kind for a device
    pub fn kind_dir(&self, device_id: &str, kind: TelemetryKind) -> PathBuf {
        self.base_dir.join(device_id).join(kind.dir_name())
    }

    /// Path a record with the given timestamp is stored at
    pub fn record_path(
        &self,
        device_id: &str,
        kind: TelemetryKind,
        ts: RecordTimestamp,
    ) -> PathBuf {
        self.kind_dir(device_id, kind).join(ts.storage_key())
    }

    /// Decode, key and persist a raw payload.
    ///
    /// Returns an error if:
    /// - The payload cannot be decoded as `kind` (`CacheError::Parse`)
    /// - The decoded payload carries no timestamp (`CacheError::Schema`)
    /// - A directory or the record file cannot be written
    pub fn store(
        &self,
        device_id: &str,
        kind: TelemetryKind,
        raw: &[u8],
    ) -> Result<StoreOutcome, CacheError> {
        let ts = kind
            .decode_timestamp(raw)
            .map_err(|e| CacheError::Parse {
                kind: kind.to_string(),
                message: e.to_string(),
            })?
            .ok_or_else(|| {
                warn!(
                    device_id,
                    kind = %kind,
                    payload = %String::from_utf8_lossy(raw),
                    "Dropping telemetry record without timestamp"
                );
                CacheError::Schema {
                    kind: kind.to_string(),
                }
            })?;

        let record_path = self.record_path(device_id, kind, ts);
        let parent = self.kind_dir(device_id, kind);
        fs::create_dir_all(&parent)?;

        if record_path.exists() {
            debug!(path = %record_path.display(), "Telemetry record already cached");
            return Ok(StoreOutcome::Duplicate(record_path));
        }

        // Uniquely named sibling temp file, moved into place only if the key is
        // still free; a concurrent delivery that lands first keeps its copy
        let mut temp = tempfile::Builder::new()
            .prefix(".incoming-")
            .tempfile_in(&parent)?;
        temp.write_all(raw)?;
        if let Err(e) = temp.persist_noclobber(&record_path) {
            if e.error.kind() == io::ErrorKind::AlreadyExists {
                debug!(path = %record_path.display(), "Telemetry record cached concurrently");
                return Ok(StoreOutcome::Duplicate(record_path));
            }
            return Err(CacheError::Io(e.error));
        }

        debug!(path = %record_path.display(), "Telemetry record stored");
        Ok(StoreOutcome::Stored(record_path))
    }

    /// List stored record paths for a device and kind, ordered by timestamp
    pub fn list(&self, device_id: &str, kind: TelemetryKind) -> Result<Vec<PathBuf>, CacheError> {
        let dir = self.kind_dir(device_id, kind);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        for entry in WalkDir::new(&dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| CacheError::Io(std::io::Error::other(e.to_string())))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            if let Some(ts) = RecordTimestamp::from_storage_key(&name) {
                records.push((ts, entry.into_path()));
            }
        }
        records.sort_by_key(|(ts, _)| *ts);

        Ok(records.into_iter().map(|(_, path)| path).collect())
    }

    /// Read a stored record back
    pub fn load(
        &self,
        device_id: &str,
        kind: TelemetryKind,
        ts: RecordTimestamp,
    ) -> Result<Option<Vec<u8>>, CacheError> {
        let path = self.record_path(device_id, kind, ts);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read(path)?))
    }
}
