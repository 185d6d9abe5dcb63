//! LabIntake Local - Filesystem side of the intake pipeline
//!
//! Provides:
//! - Watched/staging directory access with rename-only staging
//! - Write-completion detection by size or checksum quiescence
//! - Inspection and requeueing of staged files retained after a failure
//!
//! ## Modules
//!
//! - [`filesystem`] - `ISampleFileSystem` adapter over `tokio::fs`
//! - [`stability`] - `IStabilityStrategy` adapters
//! - [`staging`] - Manual recovery of retained staged files

pub mod filesystem;
pub mod stability;
pub mod staging;

use std::path::PathBuf;

use thiserror::Error;

pub use filesystem::LocalSampleFileSystem;
pub use stability::{ChecksumQuiescenceChecker, SizeQuiescenceChecker};
pub use staging::{RetainedFile, StagingArea};

/// Errors raised by the local adapters
#[derive(Debug, Error)]
pub enum LocalError {
    /// An I/O error on a specific path
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The move target is already taken; nothing is ever overwritten
    #[error("Target already exists: {0}")]
    TargetExists(PathBuf),

    /// The specified path does not exist
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// The path is not a regular file
    #[error("Not a regular file: {0}")]
    NotAFile(PathBuf),

    /// A file name given on the command line is not a bare name
    #[error("Invalid file name: {0}")]
    InvalidName(String),
}

impl LocalError {
    /// Wraps an I/O error, mapping NotFound to [`LocalError::PathNotFound`]
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            LocalError::PathNotFound(path)
        } else {
            LocalError::Io { path, source }
        }
    }
}
