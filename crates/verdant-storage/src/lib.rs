//! Verdant storage resilience
//!
//! Keeps sensor and event producers writing no matter what the
//! removable card does. Appends are routed through three tiers:
//!
//! 1. **Primary** — files under the card's mount point, verified by a
//!    real write/read/delete probe before every routing decision
//! 2. **Fallback log** — a single tagged append-only file on local
//!    storage, migrated back to primary on recovery
//! 3. **Overflow buffer** — a bounded in-memory queue, used only while
//!    both storage tiers are simultaneously unreachable
//!
//! The public surface never returns errors to producers. A write always
//! lands somewhere (or is knowingly dropped at the overflow cap), and
//! the outcome is reported through [`WriteOutcome`] and
//! [`StorageMetrics`].
//!
//! # Example
//!
//! ```rust,no_run
//! use verdant_storage::{ResilientStore, StorageConfig, WriteOutcome};
//!
//! # async fn example() {
//! let config = StorageConfig::default()
//!     .with_mount_point("/sd")
//!     .with_fallback_path("/local/fallback.csv");
//! let mut store = ResilientStore::new(config);
//!
//! match store.write("sensor.csv", "2026-01-29 14:35:00,22.5,65.0\n").await {
//!     WriteOutcome::Primary => {}
//!     WriteOutcome::Fallback => { /* card is out, data safe locally */ }
//!     WriteOutcome::Buffered => { /* both tiers down, data in RAM */ }
//! }
//! # }
//! ```

pub mod config;
pub mod error;
pub mod fallback;
pub mod manager;
pub mod metrics;
pub mod overflow;
pub mod probe;

pub use config::StorageConfig;
pub use error::StorageError;
pub use fallback::FallbackLog;
pub use manager::{ResilientStore, WriteOutcome};
pub use metrics::StorageMetrics;
pub use overflow::OverflowBuffer;
pub use probe::{ProbeOutcome, StorageProbe};
