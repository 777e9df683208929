//! Rootfs version resolution
//!
//! Order of precedence:
//! 1. an explicit version
//! 2. the full content of a `{artifact}.ver` correction file
//! 3. the artifact file name without extension and `rootfs-` prefix, which
//!    must match the configured version pattern

use crate::error::SyncError;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default pattern rootfs file names are checked against
pub const DEFAULT_VERSION_PATTERN: &str = r"^\d+\.\d+\.\d+(-[\w.-]+)?$";

const ROOTFS_PREFIX: &str = "rootfs-";
const CORRECTION_SUFFIX: &str = ".ver";

/// Compiled version pattern
#[derive(Debug, Clone)]
pub struct VersionPattern {
    regex: Regex,
}

impl VersionPattern {
    pub fn new(pattern: &str) -> Result<Self, SyncError> {
        let regex = Regex::new(pattern)
            .map_err(|e| SyncError::Config(format!("invalid version pattern {}: {}", pattern, e)))?;
        Ok(Self { regex })
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    pub fn is_match(&self, candidate: &str) -> bool {
        self.regex.is_match(candidate)
    }
}

impl Default for VersionPattern {
    fn default() -> Self {
        Self {
            regex: Regex::new(DEFAULT_VERSION_PATTERN).expect("default version pattern compiles"),
        }
    }
}

/// Path of the correction file for an artifact
pub fn correction_file(artifact: &Path) -> PathBuf {
    let mut name = artifact.as_os_str().to_os_string();
    name.push(CORRECTION_SUFFIX);
    PathBuf::from(name)
}

/// Derive a version from an artifact file name
pub fn version_from_file_name(artifact: &Path, pattern: &VersionPattern) -> Result<String, SyncError> {
    let stem = artifact
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let candidate = stem.strip_prefix(ROOTFS_PREFIX).unwrap_or(&stem);

    if !pattern.is_match(candidate) {
        return Err(SyncError::PatternMismatch {
            name: candidate.to_string(),
            pattern: pattern.as_str().to_string(),
        });
    }
    Ok(candidate.to_string())
}

/// Resolve the version a removal targets
pub fn resolve_version(
    explicit: &str,
    artifact: &Path,
    pattern: &VersionPattern,
) -> Result<String, SyncError> {
    if !explicit.is_empty() {
        return Ok(explicit.to_string());
    }

    let correction = correction_file(artifact);
    if let Ok(content) = fs::read_to_string(&correction) {
        debug!(path = %correction.display(), "Using version from correction file");
        return Ok(content);
    }

    version_from_file_name(artifact, pattern)
}
