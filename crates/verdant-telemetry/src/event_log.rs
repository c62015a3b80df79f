//! System event log
//!
//! Severity-buffered log of controller events persisted through the
//! resilient store, so a card outage never stalls or loses system
//! history. Entries are buffered in memory and flushed by severity:
//! errors immediately, warnings and infos once enough accumulate.
//! The file is rotated by size, logrotate style.
//!
//! Every entry is also emitted as a `tracing` event so the console
//! stream stays live even while storage is down.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::warn;

use verdant_core::Clock;
use verdant_storage::ResilientStore;

use serde::{Deserialize, Serialize};

/// Event log tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventLogConfig {
    /// Logical file the entries append to.
    pub file: String,
    /// Rotate once the file grows past this many bytes.
    pub max_size: u64,
    /// Flush after this many buffered entries when the most severe is info.
    pub info_flush_threshold: usize,
    /// Flush after this many buffered entries when a warning is present.
    pub warn_flush_threshold: usize,
}

impl Default for EventLogConfig {
    fn default() -> Self {
        Self {
            file: "system.log".to_string(),
            max_size: 50_000,
            info_flush_threshold: 5,
            warn_flush_threshold: 3,
        }
    }
}

/// Buffered, severity-aware system event logger.
///
/// Methods take `&mut self`; share across tasks as
/// `Arc<tokio::sync::Mutex<EventLog>>` with the lock held for one call.
pub struct EventLog {
    clock: Arc<dyn Clock>,
    store: Arc<Mutex<ResilientStore>>,
    config: EventLogConfig,
    buffer: Vec<String>,
    log_size: u64,
    flush_count: u64,
}

impl EventLog {
    pub fn new(
        clock: Arc<dyn Clock>,
        store: Arc<Mutex<ResilientStore>>,
        config: EventLogConfig,
    ) -> Self {
        Self {
            clock,
            store,
            config,
            buffer: Vec::new(),
            log_size: 0,
            flush_count: 0,
        }
    }

    /// Log an informational event.
    pub async fn info(&mut self, module: &str, message: &str) {
        tracing::info!(module, "{message}");
        self.push_entry("INFO", module, message);
        if self.buffer.len() >= self.config.info_flush_threshold {
            self.flush().await;
        }
    }

    /// Log a warning.
    pub async fn warn(&mut self, module: &str, message: &str) {
        tracing::warn!(module, "{message}");
        self.push_entry("WARN", module, message);
        if self.buffer.len() >= self.config.warn_flush_threshold {
            self.flush().await;
        }
    }

    /// Log an error. Flushed to storage immediately so the entry
    /// survives a crash that follows it.
    pub async fn error(&mut self, module: &str, message: &str) {
        tracing::error!(module, "{message}");
        self.push_entry("ERR", module, message);
        self.flush().await;
    }

    /// Persist all buffered entries through the resilient store.
    pub async fn flush(&mut self) {
        if self.buffer.is_empty() {
            return;
        }

        {
            let mut store = self.store.lock().await;
            for entry in &self.buffer {
                store.write(&self.config.file, entry).await;
                self.log_size += entry.len() as u64;
            }
        }

        self.flush_count += 1;
        self.buffer.clear();
    }

    /// Rotate the log file if it has grown past the size limit.
    ///
    /// The current file is renamed with a timestamp
    /// (`system_2026-02-16_143022.log`) and a fresh file starts on the
    /// next write. A failed rename still resets the size counter so
    /// rotation is retried a full size-cycle later, not every call.
    pub async fn check_size(&mut self) {
        if self.log_size <= self.config.max_size {
            return;
        }

        // Flush first so the archived file is complete.
        self.flush().await;

        let rotated = self.rotated_name();
        let renamed = {
            let store = self.store.lock().await;
            store.rename(&self.config.file, &rotated).await
        };
        self.log_size = 0;

        if renamed {
            self.info("EventLog", &format!("Log rotated -> {rotated}")).await;
        } else {
            warn!(file = %self.config.file, "Log rotation rename failed; size counter reset");
        }
    }

    /// Number of completed flushes to storage.
    pub fn flush_count(&self) -> u64 {
        self.flush_count
    }

    fn push_entry(&mut self, level: &str, module: &str, message: &str) {
        let ts = self.clock.timestamp();
        self.buffer.push(format!("[{ts}] [{level}] [{module}] {message}\n"));
    }

    fn rotated_name(&self) -> String {
        let ts = self.clock.file_timestamp();
        match self.config.file.strip_suffix(".log") {
            Some(stem) => format!("{stem}_{ts}.log"),
            None => format!("{}_{ts}", self.config.file),
        }
    }
}
