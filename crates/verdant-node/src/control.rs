//! Relay scheduling logic
//!
//! Fan and grow-light decisions as pure state machines, driven by task
//! loops that read the clock and the latest climate reading. Hardware
//! sits behind [`RelaySwitch`]; decisions are the testable part.
//!
//! Fans run a duty cycle anchored to midnight (on for `on_time` at the
//! start of every `interval`), overridden by a thermostat above
//! `max_temp` with hysteresis on release. The grow light follows a
//! daily dawn..sunset window.

use std::sync::Arc;
use std::time::Duration;

use chrono::Timelike;
use tokio::sync::Mutex;
use tokio::time;
use tracing::{debug, warn};

use verdant_core::Clock;
use verdant_telemetry::{EventLog, SensorCsvLogger};

use crate::config::{FanConfig, LightConfig};

/// Output seam for relay hardware. Production implementations drive a
/// GPIO line; the default just records the state.
pub trait RelaySwitch: Send {
    fn set_on(&mut self, on: bool);
}

/// Relay stand-in for nodes without GPIO wired up; state changes are
/// only traced.
pub struct TracedRelay {
    name: String,
}

impl TracedRelay {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl RelaySwitch for TracedRelay {
    fn set_on(&mut self, on: bool) {
        debug!(relay = %self.name, on, "Relay state change");
    }
}

/// What a fan evaluation decided, with enough context to log it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FanAction {
    /// Thermostat engaged; fan forced on.
    ThermostatOn { temperature: f64 },
    /// Temperature dropped out of the hysteresis band; schedule control
    /// resumes with the given state.
    ResumeSchedule { temperature: f64, on: bool },
    /// Plain duty-cycle transition.
    Schedule { on: bool },
}

impl FanAction {
    /// Desired relay state after this action.
    pub fn on(self) -> bool {
        match self {
            FanAction::ThermostatOn { .. } => true,
            FanAction::ResumeSchedule { on, .. } | FanAction::Schedule { on } => on,
        }
    }
}

/// Fan decision state machine.
pub struct FanLogic {
    interval_secs: u32,
    on_time_secs: u32,
    max_temp: f64,
    hysteresis: f64,
    thermostat_active: bool,
    activations: u64,
    last_schedule: Option<bool>,
}

impl FanLogic {
    pub fn new(config: &FanConfig) -> Self {
        let mut interval_secs = config.interval_secs;
        if interval_secs == 0 {
            warn!(fan = %config.name, "interval of zero, clamping to 1s");
            interval_secs = 1;
        }
        let mut on_time_secs = config.on_time_secs;
        if on_time_secs > interval_secs {
            warn!(
                fan = %config.name,
                on_time_secs,
                interval_secs = config.interval_secs,
                "on_time exceeds interval, clamping"
            );
            on_time_secs = interval_secs;
        }
        Self {
            interval_secs,
            on_time_secs,
            max_temp: config.max_temp,
            hysteresis: config.hysteresis,
            thermostat_active: false,
            activations: 0,
            last_schedule: None,
        }
    }

    /// Whether the duty cycle wants the fan on at this point in the day.
    pub fn schedule_on(&self, seconds_since_midnight: u32) -> bool {
        seconds_since_midnight % self.interval_secs < self.on_time_secs
    }

    /// Times the thermostat has engaged.
    pub fn activations(&self) -> u64 {
        self.activations
    }

    /// Evaluate one poll. Returns an action only when the relay state
    /// should change; `None` means leave the relay alone.
    pub fn evaluate(
        &mut self,
        seconds_since_midnight: u32,
        temperature: Option<f64>,
    ) -> Option<FanAction> {
        let schedule_on = self.schedule_on(seconds_since_midnight);

        if let Some(temp) = temperature {
            if !self.thermostat_active && temp >= self.max_temp {
                self.thermostat_active = true;
                self.activations += 1;
                // Force a schedule transition once the override releases.
                self.last_schedule = None;
                return Some(FanAction::ThermostatOn { temperature: temp });
            }
            if self.thermostat_active && temp < self.max_temp - self.hysteresis {
                self.thermostat_active = false;
                self.last_schedule = Some(schedule_on);
                return Some(FanAction::ResumeSchedule {
                    temperature: temp,
                    on: schedule_on,
                });
            }
        }

        // Inside the hysteresis band the override holds.
        if self.thermostat_active {
            return None;
        }

        if self.last_schedule != Some(schedule_on) {
            self.last_schedule = Some(schedule_on);
            return Some(FanAction::Schedule { on: schedule_on });
        }
        None
    }
}

/// Grow light decision state machine.
pub struct LightLogic {
    dawn_secs: u32,
    sunset_secs: u32,
    last_state: Option<bool>,
}

impl LightLogic {
    pub fn new(config: &LightConfig) -> Self {
        Self {
            dawn_secs: config.dawn_hour * 3600 + config.dawn_minute * 60,
            sunset_secs: config.sunset_hour * 3600 + config.sunset_minute * 60,
            last_state: None,
        }
    }

    /// Dawn inclusive, sunset exclusive.
    pub fn should_be_on(&self, seconds_since_midnight: u32) -> bool {
        (self.dawn_secs..self.sunset_secs).contains(&seconds_since_midnight)
    }

    /// Returns the new state only on transitions.
    pub fn evaluate(&mut self, seconds_since_midnight: u32) -> Option<bool> {
        let on = self.should_be_on(seconds_since_midnight);
        if self.last_state != Some(on) {
            self.last_state = Some(on);
            Some(on)
        } else {
            None
        }
    }
}

fn seconds_since_midnight(clock: &dyn Clock) -> u32 {
    clock.now_utc().time().num_seconds_from_midnight()
}

/// Fan control loop: poll, decide, drive the relay, log transitions.
pub async fn fan_task(
    name: String,
    mut logic: FanLogic,
    mut relay: Box<dyn RelaySwitch>,
    clock: Arc<dyn Clock>,
    sensor: Arc<Mutex<SensorCsvLogger>>,
    events: Arc<Mutex<EventLog>>,
    poll_interval: Duration,
) {
    loop {
        let ssm = seconds_since_midnight(clock.as_ref());
        let temperature = sensor
            .lock()
            .await
            .last_reading()
            .map(|r| r.temperature_c);

        if let Some(action) = logic.evaluate(ssm, temperature) {
            relay.set_on(action.on());
            let mut events = events.lock().await;
            match action {
                FanAction::ThermostatOn { temperature } => {
                    let msg = format!(
                        "{name} thermostat ON at {temperature:.1}°C (activation #{})",
                        logic.activations()
                    );
                    events.info("Fan", &msg).await;
                }
                FanAction::ResumeSchedule { temperature, on } => {
                    let msg = format!(
                        "{name} thermostat released at {temperature:.1}°C, schedule {}",
                        if on { "ON" } else { "OFF" }
                    );
                    events.info("Fan", &msg).await;
                }
                FanAction::Schedule { on } => {
                    let msg = format!("{name} schedule {}", if on { "ON" } else { "OFF" });
                    events.info("Fan", &msg).await;
                }
            }
        }

        time::sleep(poll_interval).await;
    }
}

/// Grow light control loop.
pub async fn light_task(
    mut logic: LightLogic,
    mut relay: Box<dyn RelaySwitch>,
    clock: Arc<dyn Clock>,
    events: Arc<Mutex<EventLog>>,
    poll_interval: Duration,
) {
    loop {
        let ssm = seconds_since_midnight(clock.as_ref());
        if let Some(on) = logic.evaluate(ssm) {
            relay.set_on(on);
            let msg = format!("Grow light {}", if on { "ON" } else { "OFF" });
            events.lock().await.info("Light", &msg).await;
        }
        time::sleep(poll_interval).await;
    }
}
