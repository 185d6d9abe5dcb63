//! Manual recovery of retained staged files
//!
//! A staged copy survives a run only when its upload (or the delete after
//! it) failed. [`StagingArea`] lists those copies and moves them back into
//! the watched directory so the next run processes them from scratch.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, instrument};

use crate::filesystem::rename_no_clobber;
use crate::LocalError;

/// A staged file left behind by an earlier run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetainedFile {
    /// Full path inside the staging directory
    pub path: PathBuf,
    /// File name (also the object key it would be uploaded under)
    pub name: String,
    /// Size in bytes
    pub size: u64,
    /// Last modification time, if the platform reports one
    pub modified: Option<DateTime<Utc>>,
}

/// The staging directory paired with the watched directory it feeds back into
#[derive(Debug, Clone)]
pub struct StagingArea {
    staging_dir: PathBuf,
    watched_dir: PathBuf,
}

impl StagingArea {
    /// Creates a staging area view
    pub fn new(staging_dir: impl Into<PathBuf>, watched_dir: impl Into<PathBuf>) -> Self {
        Self {
            staging_dir: staging_dir.into(),
            watched_dir: watched_dir.into(),
        }
    }

    /// The staging directory
    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    /// Lists retained files, sorted by name. A missing staging directory
    /// simply has nothing retained.
    pub async fn list_retained(&self) -> Result<Vec<RetainedFile>, LocalError> {
        let mut entries = match tokio::fs::read_dir(&self.staging_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(LocalError::io(&self.staging_dir, e)),
        };

        let mut retained = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| LocalError::io(&self.staging_dir, e))?
        {
            let path = entry.path();
            let meta = match tokio::fs::metadata(&path).await {
                Ok(meta) if meta.is_file() => meta,
                _ => continue,
            };
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            retained.push(RetainedFile {
                name: name.to_string(),
                size: meta.len(),
                modified: meta.modified().ok().map(DateTime::<Utc>::from),
                path,
            });
        }

        retained.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(retained)
    }

    /// Moves one retained file back into the watched directory
    ///
    /// # Arguments
    /// * `name` - Bare file name inside the staging directory
    ///
    /// # Returns
    /// The path the file now has in the watched directory
    ///
    /// # Errors
    /// Fails if `name` is not a bare file name, the staged file does not
    /// exist, or a file with the same name is already waiting in the
    /// watched directory.
    #[instrument(skip(self), fields(staging_dir = %self.staging_dir.display()))]
    pub async fn requeue(&self, name: &str) -> Result<PathBuf, LocalError> {
        let bare = Path::new(name)
            .file_name()
            .is_some_and(|n| n == std::ffi::OsStr::new(name));
        if !bare {
            return Err(LocalError::InvalidName(name.to_string()));
        }

        let source = self.staging_dir.join(name);
        let target = self.watched_dir.join(name);
        if !crate::filesystem::occupied(&source).await? {
            return Err(LocalError::PathNotFound(source));
        }
        rename_no_clobber(&source, &target).await?;

        info!(name, target = %target.display(), "Requeued staged file");
        Ok(target)
    }

    /// Moves every retained file back. Stops at the first failure.
    pub async fn requeue_all(&self) -> Result<Vec<PathBuf>, LocalError> {
        let mut moved = Vec::new();
        for file in self.list_retained().await? {
            moved.push(self.requeue(&file.name).await?);
        }
        Ok(moved)
    }
}
