//! Storage resilience manager
//!
//! Orchestrates the probe, the fallback log, and the overflow buffer so
//! that appends from producers always land somewhere and eventually
//! reach primary storage in the order they were generated, across
//! hot-swap outages of the card.
//!
//! ## Tier order
//!
//! ```text
//! primary (removable card) -> fallback log (local file) -> overflow (RAM, capped)
//! ```
//!
//! ## Ordering invariant
//!
//! New data never lands on primary ahead of older data still waiting in
//! a lower tier. `write` migrates the fallback log and flushes the
//! overflow buffer before appending the new record whenever primary is
//! available, and drains a key's RAM entries into the fallback log ahead
//! of a new fallback record.
//!
//! ## Failure semantics
//!
//! Every public method is total. Underlying I/O errors are translated
//! into [`WriteOutcome`] values, booleans, or counts; nothing propagates
//! to producers. Control loops must keep running no matter what the
//! storage hardware does.
//!
//! ## Sharing
//!
//! Methods take `&mut self` and run to completion without interleaving.
//! To share the store across tasks, wrap it in `Arc<tokio::sync::Mutex<_>>`
//! and hold the lock for exactly one call:
//!
//! ```rust,ignore
//! let store = Arc::new(Mutex::new(ResilientStore::new(config)));
//! store.lock().await.write("sensor.csv", "2026-01-29 14:35:00,22.5,65.0\n").await;
//! ```

use std::path::PathBuf;

use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, trace, warn};

use verdant_core::LogicalPath;

use crate::config::StorageConfig;
use crate::error::StorageError;
use crate::fallback::FallbackLog;
use crate::metrics::StorageMetrics;
use crate::overflow::OverflowBuffer;
use crate::probe::StorageProbe;

/// Which tier accepted a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Appended to primary storage.
    Primary,
    /// Appended to the fallback log; will migrate when primary recovers.
    Fallback,
    /// Held in the overflow buffer; both storage tiers were unreachable.
    Buffered,
}

/// Hot-swap tolerant append store.
pub struct ResilientStore {
    config: StorageConfig,
    probe: StorageProbe,
    fallback: FallbackLog,
    overflow: OverflowBuffer,
    writes_to_primary: u64,
    writes_to_fallback: u64,
    fallback_migrations: u64,
    write_failures: u64,
}

impl ResilientStore {
    /// Create a store from configuration. No files are created or
    /// validated here; everything is deferred to the first write so the
    /// system can start with storage partially unavailable.
    pub fn new(config: StorageConfig) -> Self {
        let probe = StorageProbe::new(&config.mount_point, &config.probe_file);
        let fallback = FallbackLog::new(&config.fallback_path);
        let overflow = OverflowBuffer::new(config.max_buffer_entries);
        Self {
            config,
            probe,
            fallback,
            overflow,
            writes_to_primary: 0,
            writes_to_fallback: 0,
            fallback_migrations: 0,
            write_failures: 0,
        }
    }

    /// The configuration this store was built with.
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Append `payload` to the logical file named by `path`.
    ///
    /// `path` may be bare (`sensor.csv`) or mount-prefixed
    /// (`/sd/sensor.csv`); both name the same logical file.
    pub async fn write(&mut self, path: &str, payload: &str) -> WriteOutcome {
        let key = self.normalize(path);

        // Probe exactly once per call. A probe costs a full
        // write/read/delete cycle on the card, and a second probe inside
        // the same call could disagree with the first and route data
        // out of order.
        let primary_ok = self.probe.is_available().await;

        if primary_ok {
            // Older data lands first: fallback log, then RAM entries.
            if self.fallback.has_pending().await {
                self.run_migration().await;
            }
            if !self.overflow.is_empty() {
                self.flush_with_availability(None, true).await;
            }

            match self.append_primary(&key, payload).await {
                Ok(()) => {
                    self.writes_to_primary += 1;
                    trace!(key = %key, "Wrote to primary");
                    return WriteOutcome::Primary;
                }
                Err(e) => {
                    debug!(key = %key, error = %e, "Primary append failed, trying fallback");
                }
            }
        }

        match self.route_to_fallback(&key, payload).await {
            Ok(()) => WriteOutcome::Fallback,
            Err(e) => {
                warn!(key = %key, error = %e, "Fallback unavailable, buffering in memory");
                if self.overflow.push(key.clone(), payload.to_string()) {
                    warn!(
                        cap = self.config.max_buffer_entries,
                        "Overflow cap reached, oldest entry evicted"
                    );
                }
                self.write_failures += 1;
                WriteOutcome::Buffered
            }
        }
    }

    /// Flush overflow entries for one key, or all keys when `path` is
    /// `None`. Returns true iff at least one entry reached primary.
    ///
    /// When primary is down the entries are drained into the fallback
    /// log instead: RAM should only hold data while BOTH tiers are
    /// simultaneously unreachable.
    pub async fn flush(&mut self, path: Option<&str>) -> bool {
        if self.overflow.is_empty() {
            return false;
        }
        let key = path.map(|p| self.normalize(p));
        let primary_ok = self.probe.is_available().await;
        self.flush_with_availability(key, primary_ok).await
    }

    /// Migrate every pending fallback record to primary storage.
    ///
    /// Returns the number of records written. Returns 0 immediately if
    /// primary is unavailable or nothing is pending. The fallback log is
    /// cleared only after at least one record reached primary, so a
    /// cancelled or failed pass never loses the log.
    pub async fn migrate_fallback(&mut self) -> usize {
        if !self.fallback.has_pending().await {
            return 0;
        }
        if !self.probe.is_available().await {
            return 0;
        }
        self.run_migration().await
    }

    /// Whether any tier currently holds data for this logical file.
    ///
    /// Checks primary, then the overflow buffer, then the fallback log,
    /// short-circuiting on the first hit. Producers use this to avoid
    /// rewriting CSV headers across reboots while the card is out.
    pub async fn has_data_for(&self, path: &str) -> bool {
        let key = self.normalize(path);

        if let Ok(meta) = fs::metadata(self.primary_path(&key)).await {
            if meta.len() > 0 {
                return true;
            }
        }
        if self.overflow.contains(&key) {
            return true;
        }
        self.fallback.contains_record_for(&key).await
    }

    /// Rename a file on primary storage (log rotation). Returns false on
    /// any failure, never errors. Falls back to copy-then-delete for
    /// filesystems without an atomic rename.
    pub async fn rename(&self, old: &str, new: &str) -> bool {
        let old_path = self.primary_path(&self.normalize(old));
        let new_path = self.primary_path(&self.normalize(new));

        if fs::rename(&old_path, &new_path).await.is_ok() {
            return true;
        }

        match fs::copy(&old_path, &new_path).await {
            Ok(_) => {
                if let Err(e) = fs::remove_file(&old_path).await {
                    warn!(
                        old = %old_path.display(),
                        error = %e,
                        "Rename copied but could not delete source"
                    );
                    return false;
                }
                true
            }
            Err(e) => {
                warn!(
                    old = %old_path.display(),
                    new = %new_path.display(),
                    error = %e,
                    "Rename failed"
                );
                false
            }
        }
    }

    /// Whether primary storage currently passes the probe. Supervisory
    /// tasks use this to shorten their retry period while the card is
    /// out; the write path never calls it (writes probe themselves).
    pub async fn primary_available(&self) -> bool {
        self.probe.is_available().await
    }

    /// Current metrics snapshot.
    pub fn metrics(&self) -> StorageMetrics {
        StorageMetrics {
            writes_to_primary: self.writes_to_primary,
            writes_to_fallback: self.writes_to_fallback,
            fallback_migrations: self.fallback_migrations,
            write_failures: self.write_failures,
            buffer_entries: self.overflow.len(),
            buffer_sizes_per_file: self.overflow.snapshot(),
        }
    }

    fn normalize(&self, raw: &str) -> LogicalPath {
        LogicalPath::normalize(raw, &self.config.mount_point)
    }

    fn primary_path(&self, key: &LogicalPath) -> PathBuf {
        key.resolve_on(&self.config.mount_point)
    }

    async fn append_primary(&self, key: &LogicalPath, payload: &str) -> Result<(), StorageError> {
        self.append_primary_many(key, std::slice::from_ref(&payload))
            .await
    }

    async fn append_primary_many<S: AsRef<str>>(
        &self,
        key: &LogicalPath,
        payloads: &[S],
    ) -> Result<(), StorageError> {
        let path = self.primary_path(key);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        for payload in payloads {
            file.write_all(payload.as_ref().as_bytes()).await?;
        }
        file.flush().await?;
        Ok(())
    }

    /// Append a record to the fallback log, draining this key's RAM
    /// entries ahead of it so the log itself stays chronological.
    async fn route_to_fallback(
        &mut self,
        key: &LogicalPath,
        payload: &str,
    ) -> Result<(), StorageError> {
        if self.overflow.contains(key) {
            let pending = self.overflow.peek(key);
            self.fallback.append_many(key, &pending).await?;
            self.writes_to_fallback += pending.len() as u64;
            // Entries are dropped from RAM only after the write landed.
            self.overflow.drain(key);
        }

        self.fallback.append(key, payload).await?;
        self.writes_to_fallback += 1;
        Ok(())
    }

    /// Flush overflow entries given an already-determined availability
    /// result. `write` calls this with its own probe result so one call
    /// never probes twice.
    async fn flush_with_availability(
        &mut self,
        key: Option<LogicalPath>,
        primary_ok: bool,
    ) -> bool {
        let keys = match key {
            Some(k) => vec![k],
            None => self.overflow.keys(),
        };

        let mut flushed_to_primary = false;
        for k in keys {
            let pending = self.overflow.peek(&k);
            if pending.is_empty() {
                continue;
            }

            if primary_ok {
                match self.append_primary_many(&k, &pending).await {
                    Ok(()) => {
                        self.writes_to_primary += pending.len() as u64;
                        self.overflow.drain(&k);
                        flushed_to_primary = true;
                        continue;
                    }
                    Err(e) => {
                        debug!(key = %k, error = %e, "Primary flush failed, draining to fallback");
                    }
                }
            }

            match self.fallback.append_many(&k, &pending).await {
                Ok(()) => {
                    self.writes_to_fallback += pending.len() as u64;
                    self.overflow.drain(&k);
                }
                Err(e) => {
                    debug!(key = %k, error = %e, "Fallback flush failed, entries stay in memory");
                }
            }
        }

        flushed_to_primary
    }

    /// One migration pass. Caller has already established that primary
    /// is available.
    async fn run_migration(&mut self) -> usize {
        let records = match self.fallback.drain_for_migration().await {
            Ok(records) => records,
            Err(e) => {
                debug!(error = %e, "Could not read fallback log for migration");
                return 0;
            }
        };
        if records.is_empty() {
            return 0;
        }

        let mut migrated = 0usize;
        for (raw_key, payload) in records {
            let key = self.normalize(&raw_key);
            match self.append_primary(&key, &payload).await {
                Ok(()) => {
                    self.writes_to_primary += 1;
                    migrated += 1;
                }
                Err(e) => {
                    debug!(key = %key, error = %e, "Skipping record during migration");
                }
            }
        }

        if migrated > 0 {
            match self.fallback.clear().await {
                Ok(()) => {
                    self.fallback_migrations += 1;
                    info!(migrated, "Migrated fallback records to primary");
                }
                Err(e) => {
                    warn!(error = %e, "Migration done but fallback log could not be cleared");
                }
            }
        }

        migrated
    }
}
