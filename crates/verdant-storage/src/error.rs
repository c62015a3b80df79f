//! Error types for verdant-storage
//!
//! These errors stay internal to the write pipeline. None of them cross
//! the [`ResilientStore`](crate::ResilientStore) boundary; public methods
//! translate every failure into an outcome value so producers can never
//! crash on storage hardware misbehaving.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur in storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    /// I/O error during storage operations
    #[error("I/O error: {0}")]
    Io(String),

    /// The fallback directory could not be created
    #[error("fallback directory unavailable: {}", .0.display())]
    FallbackDirUnavailable(PathBuf),
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let storage_err: StorageError = io_err.into();
        assert!(matches!(storage_err, StorageError::Io(_)));
    }

    #[test]
    fn test_fallback_dir_error_names_path() {
        let err = StorageError::FallbackDirUnavailable(PathBuf::from("/local"));
        assert!(err.to_string().contains("/local"));
    }
}
