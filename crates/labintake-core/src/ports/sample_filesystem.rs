//! Sample filesystem port (driven/secondary port)
//!
//! Operations the orchestrator performs on the watched and staging
//! directories. Paths are absolute.
//!
//! ## Design Notes
//!
//! - `stage` is a rename, never a copy, and refuses to replace an existing
//!   file at the target path.
//! - Uses `anyhow::Result`; callers map failures into `IntakeError`.

use std::path::{Path, PathBuf};

/// Port trait for the watched/staging directories
#[async_trait::async_trait]
pub trait ISampleFileSystem: Send + Sync {
    /// Lists the regular files directly inside `dir`, sorted by name
    ///
    /// Subdirectories and other non-regular entries are skipped.
    async fn list_candidates(&self, dir: &Path) -> anyhow::Result<Vec<PathBuf>>;

    /// Creates `dir` and its parents if they do not exist
    async fn ensure_dir(&self, dir: &Path) -> anyhow::Result<()>;

    /// Moves `source` to `target` atomically
    ///
    /// # Errors
    /// Fails if `target` already exists or the rename fails.
    async fn stage(&self, source: &Path, target: &Path) -> anyhow::Result<()>;

    /// Reads the full content of a file
    async fn read(&self, path: &Path) -> anyhow::Result<Vec<u8>>;

    /// Deletes a file
    async fn remove(&self, path: &Path) -> anyhow::Result<()>;

    /// Returns the current size of a file in bytes
    async fn size(&self, path: &Path) -> anyhow::Result<u64>;
}
