//! Simulated climate sensor
//!
//! Stands in for the hardware driver when running on a workstation or
//! a node without the sensor wired up. Produces a bounded random walk
//! around greenhouse-typical values, with an occasional read failure so
//! the retry path gets exercised in real deployments too.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use verdant_telemetry::{SensorReading, SensorSource, TelemetryError};

pub struct SimulatedSensor {
    rng: StdRng,
    temperature_c: f64,
    humidity_pct: f64,
    failure_rate: f64,
}

impl SimulatedSensor {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
            temperature_c: 22.0,
            humidity_pct: 60.0,
            failure_rate: 0.02,
        }
    }
}

impl Default for SimulatedSensor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SensorSource for SimulatedSensor {
    async fn sample(&mut self) -> Result<SensorReading, TelemetryError> {
        if self.rng.random_bool(self.failure_rate) {
            return Err(TelemetryError::SensorRead("simulated checksum error".into()));
        }

        self.temperature_c =
            (self.temperature_c + self.rng.random_range(-0.3..=0.3)).clamp(15.0, 32.0);
        self.humidity_pct =
            (self.humidity_pct + self.rng.random_range(-1.0..=1.0)).clamp(30.0, 90.0);

        Ok(SensorReading {
            temperature_c: self.temperature_c,
            humidity_pct: self.humidity_pct,
        })
    }
}
