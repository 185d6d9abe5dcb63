//! Per-file lifecycle of an intake pass
//!
//! ```text
//! Discovered ──► StabilityConfirmed ──► Staged ──► Validated ──► Routed ──► Cleaned
//!     │                                                             │
//!     └─► SkippedUnstable / StageFailed              RoutingFailed ◄┘
//! ```
//!
//! [`IntakeStage`] names the non-terminal states used for logging;
//! [`FileOutcome`] is the terminal state a file reaches in one run.

use std::fmt;
use std::path::{Path, PathBuf};

use super::errors::IntakeError;
use super::sample::Destination;

/// Non-terminal states a file moves through during one pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeStage {
    /// Listed in the watched directory
    Discovered,
    /// Size stopped changing over the quiescence window
    StabilityConfirmed,
    /// Moved into the staging directory
    Staged,
    /// Content validated
    Validated,
    /// Uploaded to its destination bucket
    Routed,
    /// Staged copy removed
    Cleaned,
}

impl fmt::Display for IntakeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IntakeStage::Discovered => "discovered",
            IntakeStage::StabilityConfirmed => "stability_confirmed",
            IntakeStage::Staged => "staged",
            IntakeStage::Validated => "validated",
            IntakeStage::Routed => "routed",
            IntakeStage::Cleaned => "cleaned",
        };
        write!(f, "{}", s)
    }
}

/// Terminal state of a single file in one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// Uploaded and staged copy removed
    Cleaned {
        /// Original path in the watched directory
        path: PathBuf,
        /// Where the file was routed
        destination: Destination,
    },
    /// Still being written (or its size could not be sampled); left in place
    SkippedUnstable {
        /// Path in the watched directory
        path: PathBuf,
        /// Set when the check errored rather than observing a size change
        error: Option<IntakeError>,
    },
    /// Could not be moved into staging; left in place
    StageFailed {
        /// Path in the watched directory
        path: PathBuf,
        /// The move failure
        error: IntakeError,
    },
    /// Upload failed; the staged copy is retained for manual recovery
    RoutingFailed {
        /// Path of the retained staged copy
        path: PathBuf,
        /// Where the file was being routed
        destination: Destination,
        /// The upload failure
        error: IntakeError,
    },
    /// Uploaded, but the staged copy could not be removed
    CleanupFailed {
        /// Path of the leftover staged copy
        path: PathBuf,
        /// Where the file was routed
        destination: Destination,
        /// The delete failure
        error: IntakeError,
    },
}

impl FileOutcome {
    /// Path the outcome refers to (source path, or staged path once staged)
    pub fn path(&self) -> &Path {
        match self {
            FileOutcome::Cleaned { path, .. }
            | FileOutcome::SkippedUnstable { path, .. }
            | FileOutcome::StageFailed { path, .. }
            | FileOutcome::RoutingFailed { path, .. }
            | FileOutcome::CleanupFailed { path, .. } => path,
        }
    }

    /// Destination, for outcomes that reached routing
    pub fn destination(&self) -> Option<Destination> {
        match self {
            FileOutcome::Cleaned { destination, .. }
            | FileOutcome::RoutingFailed { destination, .. }
            | FileOutcome::CleanupFailed { destination, .. } => Some(*destination),
            FileOutcome::SkippedUnstable { .. } | FileOutcome::StageFailed { .. } => None,
        }
    }

    /// The error behind a failure outcome, if any
    pub fn error(&self) -> Option<&IntakeError> {
        match self {
            FileOutcome::Cleaned { .. } => None,
            FileOutcome::SkippedUnstable { error, .. } => error.as_ref(),
            FileOutcome::StageFailed { error, .. }
            | FileOutcome::RoutingFailed { error, .. }
            | FileOutcome::CleanupFailed { error, .. } => Some(error),
        }
    }

    /// True when the file was uploaded (whether or not cleanup succeeded)
    pub fn was_uploaded(&self) -> bool {
        matches!(
            self,
            FileOutcome::Cleaned { .. } | FileOutcome::CleanupFailed { .. }
        )
    }

    /// True when a copy now sits in staging and needs manual attention
    pub fn needs_recovery(&self) -> bool {
        matches!(
            self,
            FileOutcome::RoutingFailed { .. } | FileOutcome::CleanupFailed { .. }
        )
    }

    /// Short snake_case label for logs and reports
    pub fn label(&self) -> &'static str {
        match self {
            FileOutcome::Cleaned { .. } => "cleaned",
            FileOutcome::SkippedUnstable { .. } => "skipped_unstable",
            FileOutcome::StageFailed { .. } => "stage_failed",
            FileOutcome::RoutingFailed { .. } => "routing_failed",
            FileOutcome::CleanupFailed { .. } => "cleanup_failed",
        }
    }
}
