//! Node configuration
//!
//! One TOML document tunes the whole node. Every section and field has
//! a default, so a missing file or a partial document still yields a
//! runnable configuration; `validate` rejects values that would make a
//! task loop spin or a threshold meaningless.

use std::path::Path;

use serde::{Deserialize, Serialize};

use verdant_storage::StorageConfig;
use verdant_telemetry::{EventLogConfig, SensorLogConfig};

use crate::error::NodeError;

/// Fan relay schedule: duty cycle anchored to midnight, with a
/// thermostat override above `max_temp`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FanConfig {
    pub name: String,
    /// Duty cycle period in seconds.
    pub interval_secs: u32,
    /// Seconds the fan runs at the start of each period.
    pub on_time_secs: u32,
    /// Temperature that forces the fan on regardless of schedule, °C.
    pub max_temp: f64,
    /// Degrees below `max_temp` before schedule control resumes.
    pub hysteresis: f64,
    /// Seconds between schedule/thermostat evaluations.
    pub poll_interval_secs: u64,
}

impl Default for FanConfig {
    fn default() -> Self {
        Self {
            name: "fan-1".to_string(),
            interval_secs: 600,
            on_time_secs: 20,
            max_temp: 24.0,
            hysteresis: 1.0,
            poll_interval_secs: 5,
        }
    }
}

/// Grow light daily on-window.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LightConfig {
    pub dawn_hour: u32,
    pub dawn_minute: u32,
    pub sunset_hour: u32,
    pub sunset_minute: u32,
    /// Seconds between schedule evaluations.
    pub poll_interval_secs: u64,
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            dawn_hour: 6,
            dawn_minute: 0,
            sunset_hour: 22,
            sunset_minute: 0,
            poll_interval_secs: 60,
        }
    }
}

/// Health supervision cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Seconds between health checks while primary storage is up.
    pub check_interval_secs: u64,
    /// Faster retry period while primary storage is unavailable, so a
    /// reinserted card is picked up promptly.
    pub recovery_interval_secs: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: 60,
            recovery_interval_secs: 10,
        }
    }
}

/// Complete node configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub storage: StorageConfig,
    pub event_log: EventLogConfig,
    pub sensor: SensorLogConfig,
    pub health: HealthConfig,
    pub fans: Vec<FanConfig>,
    pub light: LightConfig,
}

impl NodeConfig {
    /// Load and validate a TOML config file.
    pub async fn load(path: &Path) -> Result<Self, NodeError> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| NodeError::ConfigRead {
                path: path.to_path_buf(),
                source,
            })?;
        let config: Self = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would break a loop or a threshold.
    pub fn validate(&self) -> Result<(), NodeError> {
        fn require(cond: bool, msg: &str) -> Result<(), NodeError> {
            if cond {
                Ok(())
            } else {
                Err(NodeError::InvalidConfig(msg.to_string()))
            }
        }

        require(
            self.storage.max_buffer_entries > 0,
            "storage.max_buffer_entries must be > 0",
        )?;
        require(self.event_log.max_size > 0, "event_log.max_size must be > 0")?;
        require(
            self.event_log.info_flush_threshold > 0 && self.event_log.warn_flush_threshold > 0,
            "event_log flush thresholds must be > 0",
        )?;
        require(self.sensor.interval_secs > 0, "sensor.interval_secs must be > 0")?;
        require(self.sensor.max_retries > 0, "sensor.max_retries must be > 0")?;
        require(
            self.health.check_interval_secs > 0 && self.health.recovery_interval_secs > 0,
            "health intervals must be > 0",
        )?;

        for fan in &self.fans {
            require(
                fan.interval_secs > 0 && fan.on_time_secs > 0,
                &format!("fan '{}' timing values must be > 0", fan.name),
            )?;
            require(
                fan.hysteresis >= 0.0,
                &format!("fan '{}' hysteresis must be >= 0", fan.name),
            )?;
            require(
                fan.poll_interval_secs > 0,
                &format!("fan '{}' poll_interval_secs must be > 0", fan.name),
            )?;
        }

        require(
            self.light.dawn_hour < 24 && self.light.sunset_hour < 24,
            "light hours must be 0-23",
        )?;
        require(
            self.light.dawn_minute < 60 && self.light.sunset_minute < 60,
            "light minutes must be 0-59",
        )?;
        require(
            self.light.poll_interval_secs > 0,
            "light.poll_interval_secs must be > 0",
        )?;

        Ok(())
    }
}
