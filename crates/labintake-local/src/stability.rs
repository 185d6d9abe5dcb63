//! Write-completion detection
//!
//! Both strategies take a sample, sleep for the quiescence window, take a
//! second sample, and report the file stable iff the two agree. Any failure
//! to sample (file vanished, permission denied) is an error, which callers
//! treat as "not confirmed stable".

use std::path::Path;
use std::time::Duration;

use labintake_core::ports::stability::IStabilityStrategy;
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};

use crate::LocalError;

async fn sample_size(path: &Path) -> Result<u64, LocalError> {
    let meta = tokio::fs::metadata(path)
        .await
        .map_err(|e| LocalError::io(path, e))?;
    if !meta.is_file() {
        return Err(LocalError::NotAFile(path.to_path_buf()));
    }
    Ok(meta.len())
}

async fn sample_digest(path: &Path) -> Result<[u8; 32], LocalError> {
    let data = tokio::fs::read(path)
        .await
        .map_err(|e| LocalError::io(path, e))?;
    Ok(Sha256::digest(&data).into())
}

// ============================================================================
// Size strategy
// ============================================================================

/// Considers a file complete when its size is unchanged across the window
#[derive(Debug, Clone)]
pub struct SizeQuiescenceChecker {
    window: Duration,
}

impl SizeQuiescenceChecker {
    /// Creates a checker with the given quiescence window
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    /// The quiescence window
    pub fn window(&self) -> Duration {
        self.window
    }
}

#[async_trait::async_trait]
impl IStabilityStrategy for SizeQuiescenceChecker {
    #[instrument(skip(self), fields(path = %path.display(), window_ms = self.window.as_millis() as u64))]
    async fn is_stable(&self, path: &Path) -> anyhow::Result<bool> {
        let before = sample_size(path).await?;
        tokio::time::sleep(self.window).await;
        let after = sample_size(path).await?;

        debug!(before, after, "size sampled");
        Ok(before == after)
    }

    fn name(&self) -> &'static str {
        "size"
    }
}

// ============================================================================
// Checksum strategy
// ============================================================================

/// Considers a file complete when its SHA-256 digest is unchanged across the
/// window. Catches in-place rewrites that keep the size constant, at the cost
/// of reading the file twice.
#[derive(Debug, Clone)]
pub struct ChecksumQuiescenceChecker {
    window: Duration,
}

impl ChecksumQuiescenceChecker {
    /// Creates a checker with the given quiescence window
    pub fn new(window: Duration) -> Self {
        Self { window }
    }
}

#[async_trait::async_trait]
impl IStabilityStrategy for ChecksumQuiescenceChecker {
    #[instrument(skip(self), fields(path = %path.display(), window_ms = self.window.as_millis() as u64))]
    async fn is_stable(&self, path: &Path) -> anyhow::Result<bool> {
        let before = sample_digest(path).await?;
        tokio::time::sleep(self.window).await;
        let after = sample_digest(path).await?;

        let stable = before == after;
        debug!(stable, "digest sampled");
        Ok(stable)
    }

    fn name(&self) -> &'static str {
        "checksum"
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::TempDir;

    use super::*;

    const WINDOW: Duration = Duration::from_millis(200);

    #[tokio::test]
    async fn test_unchanged_file_is_stable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("done.json");
        std::fs::write(&path, b"{\"patient_id\":\"p1\"}").unwrap();

        let checker = SizeQuiescenceChecker::new(WINDOW);
        assert!(checker.is_stable(&path).await.unwrap());
    }

    #[tokio::test]
    async fn test_growing_file_is_not_stable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("growing.json");
        std::fs::write(&path, b"{").unwrap();

        let writer_path = path.clone();
        let writer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            let mut file = std::fs::OpenOptions::new()
                .append(true)
                .open(&writer_path)
                .unwrap();
            file.write_all(b"\"patient_id\":\"p1\"").unwrap();
        });

        let checker = SizeQuiescenceChecker::new(WINDOW);
        assert!(!checker.is_stable(&path).await.unwrap());
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn test_deleted_file_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vanishing.json");
        std::fs::write(&path, b"{}").unwrap();

        let deleter_path = path.clone();
        let deleter = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            std::fs::remove_file(&deleter_path).unwrap();
        });

        let checker = SizeQuiescenceChecker::new(WINDOW);
        let err = checker.is_stable(&path).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LocalError>(),
            Some(LocalError::PathNotFound(_))
        ));
        deleter.await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_file_is_error() {
        let dir = TempDir::new().unwrap();
        let checker = SizeQuiescenceChecker::new(Duration::from_millis(1));
        assert!(checker
            .is_stable(&dir.path().join("never.json"))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_checksum_detects_same_size_rewrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rewrite.json");
        std::fs::write(&path, b"aaaa").unwrap();

        let writer_path = path.clone();
        let writer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            std::fs::write(&writer_path, b"bbbb").unwrap();
        });

        let checker = ChecksumQuiescenceChecker::new(WINDOW);
        assert!(!checker.is_stable(&path).await.unwrap());
        writer.await.unwrap();
        assert_eq!(checker.name(), "checksum");
    }

    #[tokio::test]
    async fn test_checksum_unchanged_file_is_stable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("done.json");
        std::fs::write(&path, b"{}").unwrap();

        let checker = ChecksumQuiescenceChecker::new(Duration::from_millis(10));
        assert!(checker.is_stable(&path).await.unwrap());
    }
}
