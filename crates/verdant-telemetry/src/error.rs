//! Telemetry error types

use thiserror::Error;

/// Errors raised while acquiring sensor data.
///
/// Storage never produces errors here; the resilience layer absorbs
/// those. These cover the sensor side only.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The sensor hardware failed to produce a reading.
    #[error("Sensor read failed: {0}")]
    SensorRead(String),

    /// The sensor produced a reading outside its physical range.
    #[error("Reading out of range: {temperature_c}°C, {humidity_pct}%")]
    OutOfRange {
        temperature_c: f64,
        humidity_pct: f64,
    },
}
