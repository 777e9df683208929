//! Image references and local artifacts
//!
//! An image reference names a rootfs artifact by URI. Accepted schemes:
//! - none or `file://`: a local path, symlinks followed
//! - `http://`, `https://`: downloaded into a scoped scratch directory
//! - `oci://`, `docker://`: registry image, only its tag is used
//!
//! Any other scheme is rejected before touching the filesystem or network.

use crate::error::SyncError;
use percent_encoding::percent_decode_str;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tracing::{debug, info};

/// Parsed image reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageReference {
    /// Path on the local filesystem
    Local(PathBuf),
    /// Remote artifact fetched over HTTP(S)
    Http(String),
    /// Registry image; `tag` is `None` when the reference is untagged
    Registry { reference: String, tag: Option<String> },
}

impl ImageReference {
    /// Parse a reference by scheme.
    ///
    /// A scheme is any RFC 3986 `scheme ":"` prefix, matched case-insensitively,
    /// so `ftp:mirror/img` is rejected rather than read as a relative path.
    pub fn parse(reference: &str) -> Result<Self, SyncError> {
        let Some((scheme, rest)) = split_scheme(reference) else {
            return Ok(ImageReference::Local(PathBuf::from(reference)));
        };

        match scheme.as_str() {
            "file" => {
                let path = rest.strip_prefix("//").unwrap_or(rest);
                Ok(ImageReference::Local(PathBuf::from(path)))
            }
            "http" | "https" => Ok(ImageReference::Http(reference.to_string())),
            "oci" | "docker" => {
                let rest = rest.strip_prefix("//").unwrap_or(rest);
                // Drop the registry host so a port is never taken for a tag
                let path = rest.split_once('/').map_or("", |(_, path)| path);
                let bits: Vec<&str> = path.split(':').collect();
                let tag = match bits.as_slice() {
                    [_, tag] => Some(tag.to_string()),
                    _ => None,
                };
                Ok(ImageReference::Registry {
                    reference: reference.to_string(),
                    tag,
                })
            }
            _ => Err(SyncError::UnsupportedScheme(scheme)),
        }
    }
}

/// Split off a leading `ALPHA *( ALPHA / DIGIT / "+" / "-" / "." ) ":"`.
///
/// Returns the lowercased scheme and the remainder after the colon.
fn split_scheme(reference: &str) -> Option<(String, &str)> {
    let (scheme, rest) = reference.split_once(':')?;
    let mut chars = scheme.chars();
    if !chars.next()?.is_ascii_alphabetic() {
        return None;
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) {
        return None;
    }
    Some((scheme.to_ascii_lowercase(), rest))
}

/// Fetches a remote artifact to a local file
pub trait ArtifactFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> Result<(), SyncError>;
}

/// Blocking HTTP(S) fetcher
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, SyncError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::Download(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

impl ArtifactFetcher for HttpFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> Result<(), SyncError> {
        let mut response = self
            .client
            .get(url)
            .send()
            .map_err(|e| SyncError::Download(format!("GET {} failed: {}", url, e)))?;
        if !response.status().is_success() {
            return Err(SyncError::Download(format!(
                "GET {} failed with status {}",
                url,
                response.status()
            )));
        }
        let mut file = fs::File::create(dest)?;
        response
            .copy_to(&mut file)
            .map_err(|e| SyncError::Download(format!("reading body of {} failed: {}", url, e)))?;
        Ok(())
    }
}

/// A rootfs artifact available for version resolution.
///
/// Downloaded artifacts live in a scratch directory owned by this value and
/// are deleted when it is dropped.
#[derive(Debug)]
pub struct LocalArtifact {
    path: PathBuf,
    _scratch: Option<TempDir>,
}

impl LocalArtifact {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Make the referenced artifact available locally.
    ///
    /// HTTP downloads land in a fresh directory under `{scratch_dir}/tmp`.
    pub fn resolve(
        reference: &ImageReference,
        scratch_dir: &Path,
        fetcher: &dyn ArtifactFetcher,
    ) -> Result<Self, SyncError> {
        match reference {
            ImageReference::Local(path) => {
                let path = dunce::canonicalize(path)?;
                Ok(Self {
                    path,
                    _scratch: None,
                })
            }
            ImageReference::Http(url) => {
                let tmp_root = scratch_dir.join("tmp");
                fs::create_dir_all(&tmp_root)?;
                let scratch = tempfile::Builder::new()
                    .prefix("download-")
                    .tempdir_in(&tmp_root)?;
                let path = scratch.path().join(file_name_from_url(url));

                info!(url = %url, dest = %path.display(), "Downloading rootfs");
                // On error `scratch` is dropped here and takes any partial file with it
                fetcher.fetch(url, &path)?;
                debug!(dest = %path.display(), "Download finished");

                Ok(Self {
                    path,
                    _scratch: Some(scratch),
                })
            }
            ImageReference::Registry { tag, .. } => {
                let name = match tag {
                    Some(tag) => format!("rootfs-{}.dummy", tag),
                    None => "latest.dummy".to_string(),
                };
                Ok(Self {
                    path: PathBuf::from(name),
                    _scratch: None,
                })
            }
        }
    }
}

/// Percent-decoded last path segment of `url`, or `download` if there is none
fn file_name_from_url(url: &str) -> String {
    let name = reqwest::Url::parse(url).ok().and_then(|parsed| {
        let segment = parsed.path_segments()?.last()?.to_string();
        let decoded = percent_decode_str(&segment).decode_utf8_lossy().into_owned();
        // A decoded separator must not escape the scratch directory
        let name = decoded
            .rsplit(['/', '\\'])
            .next()
            .filter(|name| !name.is_empty() && *name != "." && *name != "..")
            .map(str::to_string);
        name
    });
    name.unwrap_or_else(|| "download".to_string())
}
