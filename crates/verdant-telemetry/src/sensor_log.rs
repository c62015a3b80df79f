//! Climate CSV logger
//!
//! Samples the climate sensor on a fixed interval and appends
//! timestamped rows through the resilient store. Files roll over by
//! date (`sensor_log_2026-01-29.csv`); the CSV header is written only
//! when no data for the file exists in any storage tier, so a card
//! swap or reboot mid-day never produces a duplicate header.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::time;

use verdant_core::Clock;
use verdant_storage::{ResilientStore, WriteOutcome};

use crate::event_log::EventLog;
use crate::sensor::{SensorReading, SensorSource};

/// Column header for climate CSV files.
pub const CSV_HEADER: &str = "Timestamp,Temperature,Humidity\n";

/// Climate logger tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorLogConfig {
    /// Seconds between samples.
    pub interval_secs: u64,
    /// Base CSV filename; the date is inserted before the extension.
    pub filename_base: String,
    /// Sensor read attempts per cycle before giving up.
    pub max_retries: u32,
    /// Delay between read attempts.
    pub retry_delay_ms: u64,
}

impl Default for SensorLogConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            filename_base: "sensor_log.csv".to_string(),
            max_retries: 3,
            retry_delay_ms: 500,
        }
    }
}

/// Periodic climate sampler with date-rolled CSV output.
pub struct SensorCsvLogger {
    clock: Arc<dyn Clock>,
    store: Arc<Mutex<ResilientStore>>,
    events: Arc<Mutex<EventLog>>,
    source: Box<dyn SensorSource>,
    config: SensorLogConfig,
    filename: String,
    current_date: NaiveDate,
    last_reading: Option<SensorReading>,
    read_failures: u64,
    write_failures: u64,
}

impl SensorCsvLogger {
    pub fn new(
        clock: Arc<dyn Clock>,
        store: Arc<Mutex<ResilientStore>>,
        events: Arc<Mutex<EventLog>>,
        source: Box<dyn SensorSource>,
        config: SensorLogConfig,
    ) -> Self {
        let current_date = clock.today();
        let filename = filename_for(&config.filename_base, current_date);
        Self {
            clock,
            store,
            events,
            source,
            config,
            filename,
            current_date,
            last_reading: None,
            read_failures: 0,
            write_failures: 0,
        }
    }

    /// The CSV file rows are currently appended to.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Most recent valid reading, cached for thermostat queries.
    pub fn last_reading(&self) -> Option<SensorReading> {
        self.last_reading
    }

    /// Cycles where every read attempt failed.
    pub fn read_failures(&self) -> u64 {
        self.read_failures
    }

    /// Rows that landed only in the overflow buffer.
    pub fn write_failures(&self) -> u64 {
        self.write_failures
    }

    /// Seconds between samples, for the task loop driving this logger.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.config.interval_secs)
    }

    /// One full cycle: rollover check, header check, sample, append.
    pub async fn log_once(&mut self) {
        self.check_date_changed().await;
        self.ensure_header().await;

        match self.read_sensor().await {
            Some(reading) => {
                self.last_reading = Some(reading);
                let row = format!(
                    "{},{:.1},{:.1}\n",
                    self.clock.timestamp(),
                    reading.temperature_c,
                    reading.humidity_pct
                );
                let outcome = self.store.lock().await.write(&self.filename, &row).await;
                if outcome == WriteOutcome::Buffered {
                    self.write_failures += 1;
                }
            }
            None => {
                let msg = format!("Sensor read failed (total: {})", self.read_failures);
                self.events.lock().await.warn("SensorLog", &msg).await;
            }
        }
    }

    /// Write the CSV header unless some tier already holds data for the
    /// current file. Runs every cycle: a freshly swapped-in blank card
    /// needs the header mid-day too.
    async fn ensure_header(&mut self) {
        let wrote = {
            let mut store = self.store.lock().await;
            if store.has_data_for(&self.filename).await {
                false
            } else {
                store.write(&self.filename, CSV_HEADER).await;
                true
            }
        };
        if wrote {
            let msg = format!("Created CSV file: {}", self.filename);
            self.events.lock().await.info("SensorLog", &msg).await;
        }
    }

    /// Sample with bounded retries and range validation.
    async fn read_sensor(&mut self) -> Option<SensorReading> {
        for attempt in 1..=self.config.max_retries {
            match self.source.sample().await.and_then(SensorReading::validate) {
                Ok(reading) => return Some(reading),
                Err(e) => {
                    let msg = format!(
                        "Read attempt {attempt}/{} failed: {e}",
                        self.config.max_retries
                    );
                    self.events.lock().await.warn("SensorLog", &msg).await;
                    if attempt < self.config.max_retries {
                        time::sleep(Duration::from_millis(self.config.retry_delay_ms)).await;
                    }
                }
            }
        }
        self.read_failures += 1;
        None
    }

    /// Switch files at midnight.
    async fn check_date_changed(&mut self) -> bool {
        let today = self.clock.today();
        if today == self.current_date {
            return false;
        }

        let old = std::mem::replace(
            &mut self.filename,
            filename_for(&self.config.filename_base, today),
        );
        self.current_date = today;

        let msg = format!("Date changed - switched from {old} to {}", self.filename);
        self.events.lock().await.info("SensorLog", &msg).await;
        true
    }
}

fn filename_for(base: &str, date: NaiveDate) -> String {
    match base.strip_suffix(".csv") {
        Some(stem) => format!("{stem}_{date}.csv"),
        None => format!("{base}_{date}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TelemetryError;
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;
    use tempfile::TempDir;
    use verdant_storage::StorageConfig;

    /// Clock whose instant can be advanced by tests.
    struct StepClock(StdMutex<DateTime<Utc>>);

    impl StepClock {
        fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> Arc<Self> {
            Arc::new(Self(StdMutex::new(
                Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap(),
            )))
        }

        fn set(&self, y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) {
            *self.0.lock().unwrap() = Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap();
        }
    }

    impl Clock for StepClock {
        fn now_utc(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    /// Sensor source that replays a script of outcomes.
    struct ScriptedSource(VecDeque<Result<SensorReading, TelemetryError>>);

    impl ScriptedSource {
        fn ok(readings: &[(f64, f64)]) -> Box<Self> {
            Box::new(Self(
                readings
                    .iter()
                    .map(|&(temperature_c, humidity_pct)| {
                        Ok(SensorReading {
                            temperature_c,
                            humidity_pct,
                        })
                    })
                    .collect(),
            ))
        }

        fn script(outcomes: Vec<Result<SensorReading, TelemetryError>>) -> Box<Self> {
            Box::new(Self(outcomes.into()))
        }
    }

    #[async_trait]
    impl SensorSource for ScriptedSource {
        async fn sample(&mut self) -> Result<SensorReading, TelemetryError> {
            self.0
                .pop_front()
                .unwrap_or_else(|| Err(TelemetryError::SensorRead("script exhausted".into())))
        }
    }

    struct Rig {
        dir: TempDir,
        clock: Arc<StepClock>,
        logger: SensorCsvLogger,
    }

    fn rig(source: Box<dyn SensorSource>) -> Rig {
        let dir = TempDir::new().unwrap();
        let clock = StepClock::at(2026, 1, 29, 14, 35, 0);
        std::fs::create_dir(dir.path().join("sd")).unwrap();

        let storage = StorageConfig::default()
            .with_mount_point(dir.path().join("sd"))
            .with_fallback_path(dir.path().join("fallback.csv"));
        let store = Arc::new(Mutex::new(ResilientStore::new(storage)));
        let events = Arc::new(Mutex::new(EventLog::new(
            clock.clone(),
            store.clone(),
            Default::default(),
        )));

        let config = SensorLogConfig {
            retry_delay_ms: 0,
            ..SensorLogConfig::default()
        };
        let logger = SensorCsvLogger::new(clock.clone(), store, events, source, config);
        Rig { dir, clock, logger }
    }

    impl Rig {
        fn csv(&self, name: &str) -> String {
            std::fs::read_to_string(self.dir.path().join("sd").join(name)).unwrap_or_default()
        }
    }

    #[tokio::test]
    async fn test_filename_carries_current_date() {
        let rig = rig(ScriptedSource::ok(&[]));
        assert_eq!(rig.logger.filename(), "sensor_log_2026-01-29.csv");
    }

    #[tokio::test]
    async fn test_header_written_once_then_rows_append() {
        let mut rig = rig(ScriptedSource::ok(&[(22.5, 65.0), (22.7, 64.8)]));

        rig.logger.log_once().await;
        rig.logger.log_once().await;

        assert_eq!(
            rig.csv("sensor_log_2026-01-29.csv"),
            "Timestamp,Temperature,Humidity\n\
             2026-01-29 14:35:00,22.5,65.0\n\
             2026-01-29 14:35:00,22.7,64.8\n"
        );
    }

    #[tokio::test]
    async fn test_retry_recovers_within_budget() {
        let bad = || Err(TelemetryError::SensorRead("checksum".into()));
        let good = Ok(SensorReading {
            temperature_c: 21.0,
            humidity_pct: 55.0,
        });
        let mut rig = rig(ScriptedSource::script(vec![bad(), bad(), good]));

        rig.logger.log_once().await;

        assert!(rig.csv("sensor_log_2026-01-29.csv").contains("21.0,55.0"));
        assert_eq!(rig.logger.read_failures(), 0);
    }

    #[tokio::test]
    async fn test_exhausted_retries_count_one_failure() {
        let bad = || Err(TelemetryError::SensorRead("checksum".into()));
        let mut rig = rig(ScriptedSource::script(vec![bad(), bad(), bad()]));

        rig.logger.log_once().await;

        assert_eq!(rig.logger.read_failures(), 1);
        assert!(rig.logger.last_reading().is_none());
        let csv = rig.csv("sensor_log_2026-01-29.csv");
        assert_eq!(csv, CSV_HEADER, "header only, no data row");
    }

    #[tokio::test]
    async fn test_out_of_range_reading_is_rejected() {
        let mut rig = rig(ScriptedSource::ok(&[(120.0, 50.0), (121.0, 50.0), (122.0, 50.0)]));

        rig.logger.log_once().await;

        assert_eq!(rig.logger.read_failures(), 1);
        assert!(!rig.csv("sensor_log_2026-01-29.csv").contains("120.0"));
    }

    #[tokio::test]
    async fn test_midnight_rollover_starts_new_file_with_header() {
        let mut rig = rig(ScriptedSource::ok(&[(20.0, 50.0), (19.5, 52.0)]));

        rig.logger.log_once().await;
        rig.clock.set(2026, 1, 30, 0, 0, 5);
        rig.logger.log_once().await;

        assert!(rig.csv("sensor_log_2026-01-29.csv").contains("20.0,50.0"));
        let next = rig.csv("sensor_log_2026-01-30.csv");
        assert!(next.starts_with(CSV_HEADER));
        assert!(next.contains("19.5,52.0"));
        assert_eq!(rig.logger.filename(), "sensor_log_2026-01-30.csv");
    }

    #[tokio::test]
    async fn test_header_suppressed_when_data_waits_in_fallback() {
        let mut rig = rig(ScriptedSource::ok(&[(20.0, 50.0), (20.1, 50.1)]));
        std::fs::remove_dir_all(rig.dir.path().join("sd")).unwrap();

        rig.logger.log_once().await;
        rig.logger.log_once().await;

        let fallback = std::fs::read_to_string(rig.dir.path().join("fallback.csv")).unwrap();
        let headers = fallback.matches("Timestamp,Temperature,Humidity").count();
        assert_eq!(headers, 1, "fallback data must suppress a second header");
    }

    #[tokio::test]
    async fn test_last_reading_cached_for_thermostat() {
        let mut rig = rig(ScriptedSource::ok(&[(27.5, 40.0)]));

        rig.logger.log_once().await;

        let reading = rig.logger.last_reading().unwrap();
        assert_eq!(reading.temperature_c, 27.5);
    }
}
