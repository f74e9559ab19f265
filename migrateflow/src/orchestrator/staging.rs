//! On-disk staging for prepared payloads.

use crate::core::Unit;
use crate::errors::MigrationError;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A per-run directory holding prepared payloads between prepare and commit.
///
/// The directory is removed when the staging area is dropped, on success
/// and failure paths alike.
#[derive(Debug)]
pub struct StagingArea {
    dir: PathBuf,
}

impl StagingArea {
    /// Creates a uniquely named staging directory under `base_dir`.
    pub async fn create(base_dir: &Path) -> Result<Self, MigrationError> {
        let dir = base_dir.join(Self::dir_name(Utc::now()));
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| MigrationError::staging(&dir, e))?;
        debug!(dir = %dir.display(), "Created staging area");
        Ok(Self { dir })
    }

    /// Builds a directory name from a timestamp and a random suffix.
    #[must_use]
    pub fn dir_name(now: DateTime<Utc>) -> String {
        format!(
            "data-migration-{}-{:08x}",
            now.format("%Y%m%d%H%M%S"),
            rand::random::<u32>()
        )
    }

    /// Returns the staging directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Returns the file a prepared unit is staged in.
    #[must_use]
    pub fn entry_path(&self, pipeline: &str, index: usize, source_id: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(pipeline.as_bytes());
        hasher.update([0u8]);
        hasher.update(index.to_le_bytes());
        hasher.update([0u8]);
        hasher.update(source_id.as_bytes());
        self.dir.join(format!("{}.json", hex::encode(hasher.finalize())))
    }

    /// Writes a unit to `path`.
    pub async fn write_unit(path: &Path, unit: &Unit) -> Result<(), MigrationError> {
        let bytes = serde_json::to_vec(unit)?;
        tokio::fs::write(path, bytes)
            .await
            .map_err(|e| MigrationError::staging(path, e))
    }

    /// Reads a unit back from `path`.
    pub async fn read_unit(path: &Path) -> Result<Unit, MigrationError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| MigrationError::staging(path, e))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Removes every staged file, keeping the directory.
    pub async fn clear(&self) -> Result<(), MigrationError> {
        match tokio::fs::remove_dir_all(&self.dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(MigrationError::staging(&self.dir, e)),
        }
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| MigrationError::staging(&self.dir, e))
    }
}

impl Drop for StagingArea {
    fn drop(&mut self) {
        match std::fs::remove_dir_all(&self.dir) {
            Ok(()) => debug!(dir = %self.dir.display(), "Removed staging area"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(dir = %self.dir.display(), error = %e, "Failed to remove staging area"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_dir_name_format() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let name = StagingArea::dir_name(now);

        assert!(name.starts_with("data-migration-20240309140507-"));
        assert_eq!(name.len(), "data-migration-20240309140507-".len() + 8);
    }

    #[tokio::test]
    async fn test_write_read_and_cleanup() {
        let base = tempfile::tempdir().unwrap();
        let staging = StagingArea::create(base.path()).await.unwrap();
        let dir = staging.path().to_path_buf();
        assert!(dir.is_dir());

        let unit = Unit::new("row-1", serde_json::json!({"name": "ada", "marker": "prepared"}));
        let path = staging.entry_path("UsersPipeline", 0, "row-1");
        StagingArea::write_unit(&path, &unit).await.unwrap();
        assert_eq!(StagingArea::read_unit(&path).await.unwrap(), unit);

        staging.clear().await.unwrap();
        assert!(dir.is_dir());
        assert!(!path.exists());

        drop(staging);
        assert!(!dir.exists());
    }

    #[test]
    fn test_entry_paths_are_distinct() {
        let staging = StagingArea {
            dir: PathBuf::from("/nonexistent/stage"),
        };
        let a = staging.entry_path("p", 0, "1");
        let b = staging.entry_path("p", 1, "1");
        let c = staging.entry_path("q", 0, "1");
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, staging.entry_path("p", 0, "1"));
    }

    #[tokio::test]
    async fn test_read_missing_file_is_staging_error() {
        let err = StagingArea::read_unit(Path::new("/nonexistent/unit.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, MigrationError::Staging { .. }));
    }
}
