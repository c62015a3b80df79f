//! Metrics snapshot
//!
//! Read-only counters recomputed on demand, never persisted. This is
//! how intentional data loss (overflow eviction) stays observable: the
//! health-check task reads the snapshot and warns on buffered entries.

use std::collections::BTreeMap;

use serde::Serialize;

/// Point-in-time view of storage tier activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageMetrics {
    /// Records committed to primary storage (direct writes, flushes,
    /// and migrated fallback records).
    pub writes_to_primary: u64,
    /// Records committed to the fallback log.
    pub writes_to_fallback: u64,
    /// Completed migration passes (fallback log drained to primary).
    pub fallback_migrations: u64,
    /// Writes that landed only in memory (both tiers unreachable).
    pub write_failures: u64,
    /// Total entries currently held in the overflow buffer.
    pub buffer_entries: usize,
    /// Per-logical-file overflow entry counts.
    pub buffer_sizes_per_file: BTreeMap<String, usize>,
}
