//! LabIntake Engine - One pass over the watched directory
//!
//! Provides:
//! - The per-file intake state machine (stability, staging, validation,
//!   routing, cleanup)
//! - A summary of every pass for the CLI and the audit trail
//!
//! ## Modules
//!
//! - [`orchestrator`] - Sequential intake pass over all candidates
//! - [`report`] - Per-run outcome summary

pub mod orchestrator;
pub mod report;

use std::path::PathBuf;

use thiserror::Error;

pub use orchestrator::IntakeOrchestrator;
pub use report::{FileSummary, IntakeReport, ReportSummary};

/// Failures that stop a pass before any file is looked at
///
/// Per-file failures never surface here; they end up as a
/// [`FileOutcome`](labintake_core::domain::FileOutcome) in the report.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The staging directory could not be created
    #[error("Failed to prepare staging directory {path}: {message}")]
    StagingUnavailable {
        /// Configured staging directory
        path: PathBuf,
        /// Underlying failure
        message: String,
    },

    /// The watched directory could not be listed
    #[error("Failed to scan watched directory {path}: {message}")]
    ScanFailed {
        /// Configured watched directory
        path: PathBuf,
        /// Underlying failure
        message: String,
    },
}
