//! Primary storage probe
//!
//! Answers "is the card genuinely writable right now". Mount state and
//! cached directory metadata are not trustworthy: FAT layers over SPI
//! block devices can satisfy a zero-byte create/delete purely from a
//! cached directory entry after the physical card has been pulled. Only
//! a real data round-trip (write, read back, compare, delete) forces
//! block-level I/O and reliably detects removal.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::trace;

/// Marker payload written on every probe. Non-empty so the write cannot
/// be satisfied from a cached directory entry alone.
const PROBE_PAYLOAD: &[u8] = b"VDok";

/// Outcome of a single probe cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Write, read-back, and delete all succeeded and the content matched.
    Writable,
    /// The round trip completed but the read-back bytes differed — a
    /// ghost write from a stale filesystem layer.
    Mismatch,
    /// Some step of the round trip failed outright.
    Unreachable,
}

/// Probes whether primary storage is writable via a data round trip.
#[derive(Debug, Clone)]
pub struct StorageProbe {
    probe_path: PathBuf,
}

impl StorageProbe {
    /// Create a probe for the given mount point. `probe_file` is the name
    /// of the transient marker file, created and removed on every call.
    pub fn new(mount_point: &Path, probe_file: &str) -> Self {
        Self {
            probe_path: mount_point.join(probe_file),
        }
    }

    /// Single yes/no availability check. No retries; retry policy belongs
    /// to the caller.
    pub async fn is_available(&self) -> bool {
        self.probe().await == ProbeOutcome::Writable
    }

    /// Run one write/read-back/delete cycle.
    ///
    /// The marker file is removed on every exit path, including after a
    /// failed read-back, so repeated probes never accumulate debris on
    /// the card.
    pub async fn probe(&self) -> ProbeOutcome {
        if let Err(e) = fs::write(&self.probe_path, PROBE_PAYLOAD).await {
            trace!(path = %self.probe_path.display(), error = %e, "Probe write failed");
            // The write may have created a partial file before failing.
            let _ = fs::remove_file(&self.probe_path).await;
            return ProbeOutcome::Unreachable;
        }

        self.read_back_and_remove().await
    }

    /// Second half of the probe cycle: read the marker back, remove it,
    /// and compare content. Split out so the mismatch path can be
    /// exercised against a marker file holding the wrong bytes.
    async fn read_back_and_remove(&self) -> ProbeOutcome {
        let read_back = fs::read(&self.probe_path).await;
        let removed = fs::remove_file(&self.probe_path).await;

        match (read_back, removed) {
            (Ok(bytes), Ok(())) if bytes == PROBE_PAYLOAD => ProbeOutcome::Writable,
            (Ok(_), Ok(())) => {
                trace!(path = %self.probe_path.display(), "Probe read-back mismatch");
                ProbeOutcome::Mismatch
            }
            (read, rm) => {
                trace!(
                    path = %self.probe_path.display(),
                    read_ok = read.is_ok(),
                    remove_ok = rm.is_ok(),
                    "Probe round trip failed"
                );
                ProbeOutcome::Unreachable
            }
        }
    }
}
