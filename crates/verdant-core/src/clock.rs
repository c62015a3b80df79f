//! Time abstraction
//!
//! Loggers stamp every persisted row and derive date-rolled filenames
//! from the wall clock. Abstracting the clock keeps midnight-rollover
//! and rotation logic testable without waiting for real midnights.

use chrono::{DateTime, NaiveDate, Utc};

/// Abstraction over wall-clock time.
pub trait Clock: Send + Sync {
    /// Current UTC datetime.
    fn now_utc(&self) -> DateTime<Utc>;

    /// Timestamp in the row format used across all persisted files,
    /// `YYYY-MM-DD HH:MM:SS`.
    fn timestamp(&self) -> String {
        self.now_utc().format("%Y-%m-%d %H:%M:%S").to_string()
    }

    /// Timestamp safe for use inside a filename (no spaces or colons),
    /// `YYYY-MM-DD_HHMMSS`.
    fn file_timestamp(&self) -> String {
        self.now_utc().format("%Y-%m-%d_%H%M%S").to_string()
    }

    /// Current UTC date, used for date-based file rollover.
    fn today(&self) -> NaiveDate {
        self.now_utc().date_naive()
    }
}

/// Real clock implementation using system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
