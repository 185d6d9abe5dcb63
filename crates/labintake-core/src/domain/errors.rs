//! Domain error types
//!
//! This module defines the error taxonomy of an intake pass. Every failure
//! the orchestrator can meet maps to exactly one [`IntakeError`] variant, and
//! the variant alone decides whether the file is skipped, rejected, or left
//! in staging for manual recovery.

use std::path::PathBuf;

use thiserror::Error;

use crate::ports::object_store::UploadError;

/// Errors raised while constructing domain values
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid path format or content
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// The file name cannot be used as an object key
    #[error("Invalid object key: {0}")]
    InvalidObjectKey(String),

    /// ID parsing error
    #[error("Invalid ID format: {0}")]
    InvalidId(String),
}

/// Errors that can occur while taking a single sample file through intake
///
/// Each variant carries enough context to be logged on its own. The
/// orchestrator never propagates these past the file they belong to.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IntakeError {
    /// The size (or checksum) of a candidate could not be sampled.
    /// The file stays in the watched directory and is retried next run.
    #[error("Stability check failed for {path}: {message}")]
    Stability {
        /// Path of the candidate file
        path: PathBuf,
        /// Underlying I/O failure
        message: String,
    },

    /// Moving the file into staging failed.
    /// The file stays in the watched directory and is retried next run.
    #[error("Failed to stage {path}: {message}")]
    Stage {
        /// Path of the candidate file
        path: PathBuf,
        /// Underlying I/O failure or collision description
        message: String,
    },

    /// The staged copy could not be read; the sample is rejected.
    #[error("Failed to read staged file {path}: {message}")]
    Unreadable {
        /// Path of the staged copy
        path: PathBuf,
        /// Underlying I/O failure
        message: String,
    },

    /// The upload to the object store failed. The staged copy is retained.
    #[error("Upload of {key} to bucket {bucket} failed: {source}")]
    Upload {
        /// Bucket the file was routed to
        bucket: String,
        /// Object key (original file name)
        key: String,
        /// Classified upload failure
        source: UploadError,
    },

    /// The rejection alert could not be delivered. Logged only.
    #[error("Notification failed: {0}")]
    Notification(String),

    /// The staged copy could not be removed after a confirmed upload.
    #[error("Failed to remove staged copy {path}: {message}")]
    Cleanup {
        /// Path of the staged copy
        path: PathBuf,
        /// Underlying I/O failure
        message: String,
    },
}

impl IntakeError {
    /// Stable machine-readable code, used in audit entries
    pub fn code(&self) -> &'static str {
        match self {
            IntakeError::Stability { .. } => "STABILITY_ERROR",
            IntakeError::Stage { .. } => "STAGE_ERROR",
            IntakeError::Unreadable { .. } => "UNREADABLE",
            IntakeError::Upload { .. } => "UPLOAD_ERROR",
            IntakeError::Notification(_) => "NOTIFICATION_ERROR",
            IntakeError::Cleanup { .. } => "CLEANUP_ERROR",
        }
    }

    /// Returns true if the file will be picked up again by the next run
    /// without any manual intervention
    pub fn is_retried_next_run(&self) -> bool {
        matches!(
            self,
            IntakeError::Stability { .. } | IntakeError::Stage { .. }
        )
    }
}
