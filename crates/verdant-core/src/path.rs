//! Logical path normalization
//!
//! A [`LogicalPath`] names a caller-facing stream (e.g.
//! `sensor_2026-01-29.csv`) independently of which physical tier
//! currently holds its data. Callers historically passed both bare
//! relative names and mount-prefixed variants (`/sd/sensor.csv`) for the
//! same file; tracking those under two map keys loses ordering and
//! duplicates headers. Normalizing in one place eliminates that class of
//! bug.

use std::borrow::Borrow;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// A normalized relative path identifying one logical file.
///
/// Construct via [`LogicalPath::normalize`]; the raw string has any
/// mount-point prefix and leading separators stripped, so equal logical
/// files always compare equal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LogicalPath(String);

impl LogicalPath {
    /// Normalize a caller-supplied path against the primary mount point.
    ///
    /// Strips a leading `<mount_point>/` prefix if present, then any
    /// remaining leading `/`. The result is always a relative name.
    pub fn normalize(raw: &str, mount_point: &Path) -> Self {
        let raw = raw.replace('\\', "/");
        let mount = mount_point.to_string_lossy().replace('\\', "/");
        let mount = mount.trim_end_matches('/');

        let stripped = if !mount.is_empty() {
            match raw.strip_prefix(mount) {
                Some(rest) if rest.is_empty() => rest,
                Some(rest) if rest.starts_with('/') => rest,
                _ => raw.as_str(),
            }
        } else {
            raw.as_str()
        };

        Self(stripped.trim_start_matches('/').to_string())
    }

    /// Resolve this logical path to a physical location under `root`.
    pub fn resolve_on(&self, root: &Path) -> PathBuf {
        root.join(&self.0)
    }

    /// The normalized relative path string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LogicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for LogicalPath {
    fn borrow(&self) -> &str {
        &self.0
    }
}
