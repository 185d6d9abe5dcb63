//! Reason codes for audit log entries
//!
//! Provides structured codes for categorizing why a file was skipped or why
//! one of its steps failed. Used by `AuditLogger` to enrich audit entries.

use std::fmt;

use labintake_core::domain::IntakeError;
use labintake_core::ports::UploadError;
use serde::{Deserialize, Serialize};

/// Structured reason codes for skipped and failed files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    /// The file changed during the quiescence window
    StillBeingWritten,
    /// The file could not be sampled (vanished, permission denied)
    StabilityCheckFailed,
    /// The move into staging failed (including an occupied staged path)
    StageFailed,
    /// The staged copy could not be read
    Unreadable,
    /// No usable storage credentials
    MissingCredentials,
    /// The object already exists in the bucket
    ObjectExists,
    /// The storage service refused the upload
    StorageRejected,
    /// The upload never completed
    NetworkFailure,
    /// The rejection alert could not be delivered
    NotificationFailed,
    /// The staged copy could not be removed
    CleanupFailed,
}

impl ReasonCode {
    /// Classifies an intake error
    pub fn for_error(error: &IntakeError) -> Self {
        match error {
            IntakeError::Stability { .. } => ReasonCode::StabilityCheckFailed,
            IntakeError::Stage { .. } => ReasonCode::StageFailed,
            IntakeError::Unreadable { .. } => ReasonCode::Unreadable,
            IntakeError::Upload { source, .. } => match source {
                UploadError::MissingCredentials => ReasonCode::MissingCredentials,
                UploadError::AlreadyExists => ReasonCode::ObjectExists,
                UploadError::Rejected { .. } => ReasonCode::StorageRejected,
                UploadError::Transport(_) => ReasonCode::NetworkFailure,
            },
            IntakeError::Notification(_) => ReasonCode::NotificationFailed,
            IntakeError::Cleanup { .. } => ReasonCode::CleanupFailed,
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReasonCode::StillBeingWritten => "still_being_written",
            ReasonCode::StabilityCheckFailed => "stability_check_failed",
            ReasonCode::StageFailed => "stage_failed",
            ReasonCode::Unreadable => "unreadable",
            ReasonCode::MissingCredentials => "missing_credentials",
            ReasonCode::ObjectExists => "object_exists",
            ReasonCode::StorageRejected => "storage_rejected",
            ReasonCode::NetworkFailure => "network_failure",
            ReasonCode::NotificationFailed => "notification_failed",
            ReasonCode::CleanupFailed => "cleanup_failed",
        };
        write!(f, "{s}")
    }
}
