//! Fallback log
//!
//! A single secondary file on always-present local storage that absorbs
//! records while primary storage is unreachable. One record per line,
//! `<logical-name>|<payload>`; the payload is opaque caller text and
//! normally carries its own trailing newline.
//!
//! The log itself never decides when it is drained: migration reads it
//! and the manager clears it, only after at least one record reached
//! primary storage.

use std::path::{Path, PathBuf};

use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, trace};

use verdant_core::LogicalPath;

use crate::error::StorageError;

/// Tagged append-only record store on local storage.
#[derive(Debug, Clone)]
pub struct FallbackLog {
    path: PathBuf,
}

impl FallbackLog {
    /// Create a handle for the fallback file at `path`. Nothing is
    /// created until the first append.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the fallback file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one tagged record. Creates the parent directory if
    /// missing. Propagates I/O errors so the caller can fall back
    /// further to the in-memory tier.
    pub async fn append(&self, key: &LogicalPath, payload: &str) -> Result<(), StorageError> {
        self.append_many(key, std::slice::from_ref(&payload)).await
    }

    /// Append several records for one key in order, with a single open.
    pub async fn append_many<S: AsRef<str>>(
        &self,
        key: &LogicalPath,
        payloads: &[S],
    ) -> Result<(), StorageError> {
        self.ensure_parent_dir().await?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        for payload in payloads {
            file.write_all(key.as_str().as_bytes()).await?;
            file.write_all(b"|").await?;
            file.write_all(payload.as_ref().as_bytes()).await?;
        }
        file.flush().await?;

        trace!(key = %key, count = payloads.len(), "Appended to fallback log");
        Ok(())
    }

    /// Cheap check: true if the fallback file exists and is non-empty.
    pub async fn has_pending(&self) -> bool {
        match fs::metadata(&self.path).await {
            Ok(meta) => meta.len() > 0,
            Err(_) => false,
        }
    }

    /// Read every record in file order as `(raw_key, payload)` pairs.
    ///
    /// Lines without a `|` separator are corrupt; they are skipped
    /// without aborting the read. Payload bytes are preserved exactly,
    /// including the trailing newline. Does NOT clear the file — that is
    /// the caller's responsibility after a successful migration.
    pub async fn drain_for_migration(&self) -> Result<Vec<(String, String)>, StorageError> {
        let contents = fs::read_to_string(&self.path).await?;

        let mut records = Vec::new();
        let mut skipped = 0usize;
        for line in contents.split_inclusive('\n') {
            match line.split_once('|') {
                Some((key, payload)) => records.push((key.to_string(), payload.to_string())),
                None => {
                    if !line.trim().is_empty() {
                        skipped += 1;
                    }
                }
            }
        }

        if skipped > 0 {
            debug!(skipped, "Skipped malformed fallback records");
        }
        Ok(records)
    }

    /// Truncate the fallback file to empty.
    pub async fn clear(&self) -> Result<(), StorageError> {
        fs::write(&self.path, b"").await?;
        Ok(())
    }

    /// Whether any record for `key` is present, without touching primary
    /// storage. False on any read error.
    pub async fn contains_record_for(&self, key: &LogicalPath) -> bool {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(_) => return false,
        };

        let prefix = format!("{}|", key.as_str());
        contents.lines().any(|line| line.starts_with(&prefix))
    }

    async fn ensure_parent_dir(&self) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|_| StorageError::FallbackDirUnavailable(parent.to_path_buf()))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn key(name: &str) -> LogicalPath {
        LogicalPath::normalize(name, Path::new("/sd"))
    }

    fn log_in(dir: &TempDir) -> FallbackLog {
        FallbackLog::new(dir.path().join("local/fallback.csv"))
    }

    #[tokio::test]
    async fn test_append_creates_parent_dir() {
        let dir = TempDir::new().unwrap();
        let log = log_in(&dir);

        log.append(&key("a.csv"), "x\n").await.unwrap();
        assert!(log.path().exists());
        assert!(log.has_pending().await);
    }

    #[tokio::test]
    async fn test_record_format_and_order() {
        let dir = TempDir::new().unwrap();
        let log = log_in(&dir);

        log.append(&key("a.csv"), "x\n").await.unwrap();
        log.append(&key("a.csv"), "y\n").await.unwrap();

        let contents = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(contents, "a.csv|x\na.csv|y\n");
    }

    #[tokio::test]
    async fn test_drain_preserves_payload_bytes() {
        let dir = TempDir::new().unwrap();
        let log = log_in(&dir);

        log.append(&key("a.csv"), "1,22.5,65.0\n").await.unwrap();
        log.append(&key("b.csv"), "2,21.9,64.1\n").await.unwrap();

        let records = log.drain_for_migration().await.unwrap();
        assert_eq!(
            records,
            vec![
                ("a.csv".to_string(), "1,22.5,65.0\n".to_string()),
                ("b.csv".to_string(), "2,21.9,64.1\n".to_string()),
            ]
        );
        // Draining does not clear the file.
        assert!(log.has_pending().await);
    }

    #[tokio::test]
    async fn test_malformed_lines_skipped() {
        let dir = TempDir::new().unwrap();
        let log = log_in(&dir);

        log.append(&key("a.csv"), "good\n").await.unwrap();
        // Corrupt line with no separator, e.g. from a torn write.
        let mut raw = std::fs::read_to_string(log.path()).unwrap();
        raw.push_str("no separator here\n");
        std::fs::write(log.path(), raw).unwrap();
        log.append(&key("a.csv"), "also good\n").await.unwrap();

        let records = log.drain_for_migration().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].1, "good\n");
        assert_eq!(records[1].1, "also good\n");
    }

    #[tokio::test]
    async fn test_clear_truncates() {
        let dir = TempDir::new().unwrap();
        let log = log_in(&dir);

        log.append(&key("a.csv"), "x\n").await.unwrap();
        log.clear().await.unwrap();

        assert!(!log.has_pending().await);
        assert_eq!(std::fs::read_to_string(log.path()).unwrap(), "");
    }

    #[tokio::test]
    async fn test_contains_record_for() {
        let dir = TempDir::new().unwrap();
        let log = log_in(&dir);

        log.append(&key("a.csv"), "x\n").await.unwrap();

        assert!(log.contains_record_for(&key("a.csv")).await);
        assert!(!log.contains_record_for(&key("b.csv")).await);
        // Key that is a prefix of a stored key must not match.
        assert!(!log.contains_record_for(&key("a.cs")).await);
    }

    #[tokio::test]
    async fn test_missing_file_is_benign() {
        let dir = TempDir::new().unwrap();
        let log = log_in(&dir);

        assert!(!log.has_pending().await);
        assert!(!log.contains_record_for(&key("a.csv")).await);
        assert!(log.drain_for_migration().await.is_err());
    }

    #[tokio::test]
    async fn test_append_fails_when_dir_uncreatable() {
        let dir = TempDir::new().unwrap();
        // Parent "local" exists as a FILE, so create_dir_all must fail.
        std::fs::write(dir.path().join("local"), b"not a dir").unwrap();
        let log = log_in(&dir);

        let result = log.append(&key("a.csv"), "x\n").await;
        assert!(matches!(
            result,
            Err(StorageError::FallbackDirUnavailable(_))
        ));
    }
}
