//! Storage configuration
//!
//! All storage tuning lives in one struct passed into the manager's
//! constructor. Lifecycle is tied to the manager instance; there is no
//! process-global storage state.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Configuration for the storage resilience subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Mount point of primary (removable) storage.
    pub mount_point: PathBuf,
    /// Path of the fallback file on always-present local storage.
    pub fallback_path: PathBuf,
    /// Global cap on in-memory overflow entries, across all logical files.
    pub max_buffer_entries: usize,
    /// Name of the transient probe marker file on primary storage.
    pub probe_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            mount_point: PathBuf::from("/sd"),
            fallback_path: PathBuf::from("/local/fallback.csv"),
            // Sized for a small-RAM controller, not a workstation.
            max_buffer_entries: 200,
            probe_file: ".probe".to_string(),
        }
    }
}

impl StorageConfig {
    /// Config rooted at a custom primary mount point.
    pub fn with_mount_point(mut self, mount_point: impl Into<PathBuf>) -> Self {
        self.mount_point = mount_point.into();
        self
    }

    /// Set the fallback file path.
    pub fn with_fallback_path(mut self, fallback_path: impl Into<PathBuf>) -> Self {
        self.fallback_path = fallback_path.into();
        self
    }

    /// Set the overflow buffer cap.
    pub fn with_max_buffer_entries(mut self, max: usize) -> Self {
        self.max_buffer_entries = max;
        self
    }
}
