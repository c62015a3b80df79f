//! # Verdant Core
//!
//! Foundational types for the Verdant grow-chamber controller.
//!
//! This crate provides the small set of abstractions shared by every
//! other crate in the workspace:
//!
//! - [`LogicalPath`]: A normalized stream identifier. The same logical
//!   file must be tracked under exactly one key regardless of whether a
//!   caller supplies `sensor.csv` or `/sd/sensor.csv`; this newtype is the
//!   only way to construct such a key.
//! - [`Clock`]: Time abstraction so loggers and schedulers can be tested
//!   against a scripted clock instead of the wall clock.

pub mod clock;
pub mod path;

pub use clock::{Clock, SystemClock};
pub use path::LogicalPath;
