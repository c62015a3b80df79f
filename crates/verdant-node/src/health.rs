//! Storage health supervision
//!
//! Periodic task that nudges the storage tiers back toward steady
//! state: flush any RAM-buffered entries, migrate the fallback log,
//! and surface degraded conditions in the system log. While primary
//! storage is down the loop runs on a shorter period so a reinserted
//! card is picked up within seconds, not a full check interval.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time;
use tracing::debug;

use verdant_storage::ResilientStore;
use verdant_telemetry::EventLog;

use crate::config::HealthConfig;

/// Outcome of one supervision pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthReport {
    pub primary_available: bool,
    pub buffer_entries: usize,
    pub migrated: usize,
}

/// One supervision pass: flush, migrate, report.
pub async fn check_once(
    store: &Arc<Mutex<ResilientStore>>,
    events: &Arc<Mutex<EventLog>>,
) -> HealthReport {
    let (report, flushed) = {
        let mut store = store.lock().await;
        let flushed = store.flush(None).await;
        let migrated = store.migrate_fallback().await;
        let primary_available = store.primary_available().await;
        let buffer_entries = store.metrics().buffer_entries;
        (
            HealthReport {
                primary_available,
                buffer_entries,
                migrated,
            },
            flushed,
        )
    };

    if flushed {
        debug!("Flushed buffered entries to primary");
    }
    if report.migrated > 0 {
        let msg = format!(
            "Migrated {} fallback entries to primary storage",
            report.migrated
        );
        events.lock().await.info("Health", &msg).await;
    }
    if report.buffer_entries > 0 {
        let msg = format!(
            "Buffer has {} entries (storage may be unavailable)",
            report.buffer_entries
        );
        events.lock().await.warn("Health", &msg).await;
    }

    report
}

/// Supervision loop. Never returns; drop the task to stop it.
pub async fn run(
    store: Arc<Mutex<ResilientStore>>,
    events: Arc<Mutex<EventLog>>,
    config: HealthConfig,
) {
    let check = Duration::from_secs(config.check_interval_secs);
    let recovery = Duration::from_secs(config.recovery_interval_secs);

    loop {
        let report = check_once(&store, &events).await;
        let period = if report.primary_available {
            check
        } else {
            recovery
        };
        time::sleep(period).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use tempfile::TempDir;
    use verdant_core::Clock;
    use verdant_storage::StorageConfig;
    use verdant_telemetry::EventLogConfig;

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now_utc(&self) -> DateTime<Utc> {
            self.0
        }
    }

    struct Rig {
        dir: TempDir,
        store: Arc<Mutex<ResilientStore>>,
        events: Arc<Mutex<EventLog>>,
    }

    fn rig() -> Rig {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("sd")).unwrap();

        let storage = StorageConfig::default()
            .with_mount_point(dir.path().join("sd"))
            .with_fallback_path(dir.path().join("fallback.csv"));
        let store = Arc::new(Mutex::new(ResilientStore::new(storage)));
        let clock: Arc<dyn Clock> =
            Arc::new(FixedClock(Utc.with_ymd_and_hms(2026, 1, 29, 12, 0, 0).unwrap()));
        let events = Arc::new(Mutex::new(EventLog::new(
            clock,
            store.clone(),
            EventLogConfig::default(),
        )));
        Rig { dir, store, events }
    }

    #[tokio::test]
    async fn test_healthy_system_reports_clean() {
        let rig = rig();
        let report = check_once(&rig.store, &rig.events).await;

        assert_eq!(
            report,
            HealthReport {
                primary_available: true,
                buffer_entries: 0,
                migrated: 0,
            }
        );
    }

    #[tokio::test]
    async fn test_migrates_backlog_after_card_returns() {
        let rig = rig();
        let sd = rig.dir.path().join("sd");

        std::fs::remove_dir_all(&sd).unwrap();
        rig.store.lock().await.write("a.csv", "x\n").await;
        std::fs::create_dir(&sd).unwrap();

        let report = check_once(&rig.store, &rig.events).await;

        assert_eq!(report.migrated, 1);
        assert!(report.primary_available);
        assert_eq!(std::fs::read_to_string(sd.join("a.csv")).unwrap(), "x\n");
    }

    #[tokio::test]
    async fn test_reports_unavailable_primary_and_buffered_entries() {
        let rig = rig();
        let sd = rig.dir.path().join("sd");

        std::fs::remove_dir_all(&sd).unwrap();
        // Break the fallback tier too so the write is RAM-only: a
        // directory squatting on the fallback path makes appends fail.
        std::fs::create_dir(rig.dir.path().join("fallback.csv")).unwrap();

        rig.store.lock().await.write("a.csv", "x\n").await;

        let report = check_once(&rig.store, &rig.events).await;
        assert!(!report.primary_available);
        assert_eq!(report.buffer_entries, 1);
    }
}
