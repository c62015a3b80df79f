//! Node error types

use std::path::PathBuf;

use thiserror::Error;

/// Errors that stop the node from starting. Runtime storage and sensor
/// trouble never surfaces here; it is absorbed by the resilience layer.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("Failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}
