//! Sample file entity and routing destinations
//!
//! A [`SampleFile`] is identified by the path it was discovered at in the
//! watched directory. It is exclusively owned by the run that discovered it:
//! once moved into staging it is never revisited by the same run.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::validation::ValidationResult;

/// A sample-result file discovered in the watched directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleFile {
    /// Where the producer dropped the file
    source_path: PathBuf,
    /// File name, reused as the object key in the sink
    file_name: String,
    /// Size observed when the stability check confirmed the file
    discovered_size: Option<u64>,
    /// Location after the move into staging
    staged_path: Option<PathBuf>,
}

impl SampleFile {
    /// Creates a sample file for a path found in the watched directory
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidObjectKey`] if the path has no file name
    /// or the name is not valid UTF-8 (it could not be used as an object key).
    pub fn new(source_path: impl Into<PathBuf>) -> Result<Self, DomainError> {
        let source_path = source_path.into();
        let file_name = source_path
            .file_name()
            .ok_or_else(|| DomainError::InvalidObjectKey(source_path.display().to_string()))?
            .to_str()
            .ok_or_else(|| DomainError::InvalidObjectKey(source_path.display().to_string()))?
            .to_string();

        Ok(Self {
            source_path,
            file_name,
            discovered_size: None,
            staged_path: None,
        })
    }

    /// Path in the watched directory
    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Original file name
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Object key used when uploading (the original file name)
    pub fn object_key(&self) -> &str {
        &self.file_name
    }

    /// Size snapshot taken when the file was confirmed stable
    pub fn discovered_size(&self) -> Option<u64> {
        self.discovered_size
    }

    /// Records the size snapshot
    pub fn set_discovered_size(&mut self, size: u64) {
        self.discovered_size = Some(size);
    }

    /// Path in the staging directory, once staged
    pub fn staged_path(&self) -> Option<&Path> {
        self.staged_path.as_deref()
    }

    /// Records that the file now lives at `staged_path`
    pub fn mark_staged(&mut self, staged_path: PathBuf) {
        self.staged_path = Some(staged_path);
    }

    /// Where this file would land inside `staging_dir`
    pub fn staging_target(&self, staging_dir: &Path) -> PathBuf {
        staging_dir.join(&self.file_name)
    }
}

/// The sink a sample file is routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    /// Sample passed validation
    Accepted,
    /// Sample failed validation (or could not be read)
    Rejected,
}

impl Destination {
    /// Picks the destination for a validation result.
    ///
    /// The decision depends on `valid` alone.
    pub fn for_result(result: &ValidationResult) -> Self {
        if result.is_valid() {
            Destination::Accepted
        } else {
            Destination::Rejected
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Destination::Accepted => "accepted",
            Destination::Rejected => "rejected",
        };
        write!(f, "{}", s)
    }
}

/// Bucket identifiers bound to each destination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Buckets {
    /// Bucket receiving valid samples
    pub accepted: String,
    /// Bucket receiving rejected samples
    pub rejected: String,
}

impl Buckets {
    /// Creates a bucket binding
    pub fn new(accepted: impl Into<String>, rejected: impl Into<String>) -> Self {
        Self {
            accepted: accepted.into(),
            rejected: rejected.into(),
        }
    }

    /// Returns the bucket bound to `destination`
    pub fn for_destination(&self, destination: Destination) -> &str {
        match destination {
            Destination::Accepted => &self.accepted,
            Destination::Rejected => &self.rejected,
        }
    }
}
