//! Verdant telemetry producers
//!
//! The two data producers of the controller, both writing through the
//! resilient store so storage outages never interrupt acquisition:
//!
//! - [`EventLog`] — severity-buffered system log with size-based
//!   rotation
//! - [`SensorCsvLogger`] — periodic climate sampling into date-rolled
//!   CSV files, with validation and bounded retries
//!
//! Hardware is abstracted behind [`SensorSource`]; time behind
//! `verdant_core::Clock`.

pub mod error;
pub mod event_log;
pub mod sensor;
pub mod sensor_log;

pub use error::TelemetryError;
pub use event_log::{EventLog, EventLogConfig};
pub use sensor::{SensorReading, SensorSource, HUMIDITY_RANGE_PCT, TEMPERATURE_RANGE_C};
pub use sensor_log::{SensorCsvLogger, SensorLogConfig, CSV_HEADER};
