//! Sensor acquisition seam
//!
//! Hardware drivers live behind [`SensorSource`] so the logging and
//! validation logic stays testable on a workstation. A production
//! implementation wraps the climate sensor driver; tests script
//! readings and failures.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::TelemetryError;

/// Physical range of a plausible temperature reading, in °C.
pub const TEMPERATURE_RANGE_C: std::ops::RangeInclusive<f64> = -40.0..=80.0;

/// Physical range of a plausible relative-humidity reading, in %.
pub const HUMIDITY_RANGE_PCT: std::ops::RangeInclusive<f64> = 0.0..=100.0;

/// One temperature/humidity sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub temperature_c: f64,
    pub humidity_pct: f64,
}

impl SensorReading {
    /// Reject readings outside the sensor's physical range. Out-of-range
    /// values mean a bad bus transfer, not an exotic climate.
    pub fn validate(self) -> Result<Self, TelemetryError> {
        if TEMPERATURE_RANGE_C.contains(&self.temperature_c)
            && HUMIDITY_RANGE_PCT.contains(&self.humidity_pct)
        {
            Ok(self)
        } else {
            Err(TelemetryError::OutOfRange {
                temperature_c: self.temperature_c,
                humidity_pct: self.humidity_pct,
            })
        }
    }
}

/// Source of climate samples.
#[async_trait]
pub trait SensorSource: Send {
    /// Take one raw sample. Implementations do not validate or retry;
    /// the logger owns both.
    async fn sample(&mut self) -> Result<SensorReading, TelemetryError>;
}
