//! Local filesystem adapter (secondary/driven adapter)
//!
//! Implements [`ISampleFileSystem`] using `tokio::fs` for async file operations.
//!
//! ## Design Decisions
//!
//! - **Rename-only staging**: `stage` is a plain rename, so a file is either
//!   in the watched directory or in staging, never in both. A rename across
//!   filesystems fails instead of falling back to a copy.
//! - **No clobbering**: an existing file at the staging target (a copy
//!   retained from an earlier failed run) makes `stage` fail. Runs are
//!   serialized externally, so the existence check cannot race another run.
//! - **Regular files only**: candidates are checked with `symlink_metadata`.
//!   A symbolic link is never a candidate, since renaming it would stage the
//!   link while its target stayed behind in place.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use labintake_core::ports::sample_filesystem::ISampleFileSystem;
use tracing::{debug, instrument};

use crate::LocalError;

/// Adapter that bridges the [`ISampleFileSystem`] port to the real filesystem.
///
/// Zero-sized: every operation takes its paths as arguments, and the
/// directories themselves come from configuration at a higher layer.
#[derive(Debug, Clone, Default)]
pub struct LocalSampleFileSystem;

impl LocalSampleFileSystem {
    /// Create a new `LocalSampleFileSystem`.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

/// Returns true if anything (file, directory, dangling symlink) sits at `path`
pub(crate) async fn occupied(path: &Path) -> Result<bool, LocalError> {
    match tokio::fs::symlink_metadata(path).await {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(LocalError::io(path, e)),
    }
}

/// Renames `source` to `target`, refusing to replace an existing target
pub(crate) async fn rename_no_clobber(source: &Path, target: &Path) -> Result<(), LocalError> {
    if occupied(target).await? {
        return Err(LocalError::TargetExists(target.to_path_buf()));
    }
    tokio::fs::rename(source, target)
        .await
        .map_err(|e| LocalError::io(source, e))
}

#[async_trait::async_trait]
impl ISampleFileSystem for LocalSampleFileSystem {
    #[instrument(skip(self), fields(dir = %dir.display()))]
    async fn list_candidates(&self, dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
        let mut entries = tokio::fs::read_dir(dir)
            .await
            .map_err(|e| LocalError::io(dir, e))?;

        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| LocalError::io(dir, e))?
        {
            let path = entry.path();
            // Links are not followed; see the module docs
            match tokio::fs::symlink_metadata(&path).await {
                Ok(meta) if meta.is_file() => files.push(path),
                Ok(_) => debug!(path = %path.display(), "skipping non-regular entry"),
                Err(e) => debug!(path = %path.display(), error = %e, "skipping unreadable entry"),
            }
        }

        files.sort();
        debug!(count = files.len(), "candidates listed");
        Ok(files)
    }

    #[instrument(skip(self), fields(dir = %dir.display()))]
    async fn ensure_dir(&self, dir: &Path) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| LocalError::io(dir, e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(source = %source.display(), target = %target.display()))]
    async fn stage(&self, source: &Path, target: &Path) -> anyhow::Result<()> {
        rename_no_clobber(source, target).await?;
        debug!("file staged");
        Ok(())
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    async fn read(&self, path: &Path) -> anyhow::Result<Vec<u8>> {
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| LocalError::io(path, e))?;
        debug!(bytes = data.len(), "file read complete");
        Ok(data)
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    async fn remove(&self, path: &Path) -> anyhow::Result<()> {
        tokio::fs::remove_file(path)
            .await
            .map_err(|e| LocalError::io(path, e))?;
        debug!("file removed");
        Ok(())
    }

    async fn size(&self, path: &Path) -> anyhow::Result<u64> {
        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|e| LocalError::io(path, e))?;
        if !meta.is_file() {
            return Err(LocalError::NotAFile(path.to_path_buf()).into());
        }
        Ok(meta.len())
    }
}

// ============================================================================
// Unit tests
// ============================================================================
