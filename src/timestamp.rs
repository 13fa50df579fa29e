//! The watermark file
//!
//! A plain-text file holding one decimal integer: the Unix time of the
//! last successful run. Read at the start of a detection pass, overwritten
//! with "now" at the end — not with the newest entry timestamp seen.

use crate::{BundlewatchError, Result, Timestamp};
use std::fs;
use std::path::{Path, PathBuf};

/// Handle to the last-execution timestamp file
#[derive(Debug, Clone)]
pub struct WatermarkFile {
    path: PathBuf,
}

impl WatermarkFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored timestamp
    pub fn read(&self) -> Result<Timestamp> {
        let content = fs::read_to_string(&self.path)?;
        content.trim().parse().map_err(|_| {
            BundlewatchError::Parse(format!(
                "{} does not contain a Unix timestamp",
                self.path.display()
            ))
        })
    }

    /// Overwrite the stored timestamp
    pub fn write(&self, timestamp: Timestamp) -> Result<()> {
        fs::write(&self.path, timestamp.to_string())?;
        Ok(())
    }

    /// Write the current time, refusing to overwrite an existing
    /// non-empty file unless `force` is set. Returns the written time.
    pub fn init(&self, force: bool) -> Result<Timestamp> {
        if !force {
            if let Ok(content) = fs::read_to_string(&self.path) {
                if !content.trim().is_empty() {
                    return Err(BundlewatchError::WatermarkExists {
                        path: self.path.clone(),
                    });
                }
            }
        }

        let timestamp = now();
        self.write(timestamp)?;
        Ok(timestamp)
    }
}

/// Current Unix time in seconds
pub fn now() -> Timestamp {
    chrono::Utc::now().timestamp()
}

/// Human-readable UTC rendering of a Unix timestamp
pub fn human_readable(timestamp: Timestamp) -> String {
    chrono::DateTime::from_timestamp(timestamp, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_read_roundtrip() {
        let dir = TempDir::new().unwrap();
        let watermark = WatermarkFile::new(dir.path().join(".last_execution"));

        watermark.write(1649762596).unwrap();
        assert_eq!(watermark.read().unwrap(), 1649762596);
    }

    #[test]
    fn test_read_tolerates_surrounding_whitespace() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".last_execution");
        fs::write(&path, "1649762596\n").unwrap();

        assert_eq!(WatermarkFile::new(&path).read().unwrap(), 1649762596);
    }

    #[test]
    fn test_read_missing_file_is_io_error() {
        let watermark = WatermarkFile::new("/nonexistent/.last_execution");
        assert!(matches!(
            watermark.read().unwrap_err(),
            BundlewatchError::Io(_)
        ));
    }

    #[test]
    fn test_read_garbage_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".last_execution");
        fs::write(&path, "yesterday").unwrap();

        assert!(matches!(
            WatermarkFile::new(&path).read().unwrap_err(),
            BundlewatchError::Parse(_)
        ));
    }

    #[test]
    fn test_init_creates_and_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        let watermark = WatermarkFile::new(dir.path().join(".last_execution"));

        let written = watermark.init(false).unwrap();
        assert_eq!(watermark.read().unwrap(), written);

        assert!(matches!(
            watermark.init(false).unwrap_err(),
            BundlewatchError::WatermarkExists { .. }
        ));

        // --force overrides
        assert!(watermark.init(true).is_ok());
    }

    #[test]
    fn test_init_overwrites_empty_file_without_force() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".last_execution");
        fs::write(&path, "").unwrap();

        assert!(WatermarkFile::new(&path).init(false).is_ok());
    }

    #[test]
    fn test_human_readable() {
        assert_eq!(human_readable(1649762596), "2022-04-12T11:23:16");
        assert_eq!(human_readable(0), "1970-01-01T00:00:00");
    }
}
