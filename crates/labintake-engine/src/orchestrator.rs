//! Intake orchestrator
//!
//! The [`IntakeOrchestrator`] takes every candidate in the watched directory
//! through one pass of the intake pipeline.
//!
//! ## Per-file flow
//!
//! 1. **Stability**: the file must not change over the quiescence window
//! 2. **Stage**: rename into the staging directory (never copy, never clobber)
//! 3. **Validate**: read the staged copy; an unreadable copy is rejected
//! 4. **Route**: exactly one upload, plus an alert for rejected samples
//!    (sent even when that upload fails)
//! 5. **Clean**: delete the staged copy, only after a confirmed upload
//!
//! Files are processed strictly one after another. A failure ends the flow
//! for that file only; the pass always moves on to the next candidate.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, error, info, instrument, warn};

use labintake_audit::AuditLogger;
use labintake_core::domain::{
    validate_sample, FileOutcome, IntakeError, IntakeStage, RunId, SampleFile, ValidationResult,
};
use labintake_core::ports::{ISampleFileSystem, IStabilityStrategy};
use labintake_core::usecases::{AlertStatus, SampleRouter};

use crate::report::IntakeReport;
use crate::EngineError;

/// Runs intake passes over one watched directory
///
/// ## Dependencies
///
/// - `filesystem`: Listing, staging, reading and removing sample files
/// - `stability`: Decides whether a candidate has finished being written
/// - `router`: Uploads to the destination bucket and sends rejection alerts
/// - `audit`: Structured audit trail of every step
pub struct IntakeOrchestrator {
    filesystem: Arc<dyn ISampleFileSystem>,
    stability: Arc<dyn IStabilityStrategy>,
    router: SampleRouter,
    audit: AuditLogger,
    watched_dir: PathBuf,
    staging_dir: PathBuf,
}

impl IntakeOrchestrator {
    /// Creates an orchestrator
    ///
    /// # Arguments
    /// * `filesystem` - Sample file operations
    /// * `stability` - Write-completion check
    /// * `router` - Upload and alert use case
    /// * `audit` - Audit logger
    /// * `watched_dir` - Directory producers drop files into
    /// * `staging_dir` - Directory files are moved into while processed
    pub fn new(
        filesystem: Arc<dyn ISampleFileSystem>,
        stability: Arc<dyn IStabilityStrategy>,
        router: SampleRouter,
        audit: AuditLogger,
        watched_dir: impl Into<PathBuf>,
        staging_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            filesystem,
            stability,
            router,
            audit,
            watched_dir: watched_dir.into(),
            staging_dir: staging_dir.into(),
        }
    }

    /// The watched directory
    pub fn watched_dir(&self) -> &Path {
        &self.watched_dir
    }

    /// The staging directory
    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    /// Performs one pass over every candidate in the watched directory
    ///
    /// # Returns
    /// An [`IntakeReport`] with the terminal state of every candidate
    ///
    /// # Errors
    /// Only when the pass cannot start: the staging directory cannot be
    /// created or the watched directory cannot be listed. Per-file failures
    /// are reported as outcomes instead.
    pub async fn run_once(&self) -> Result<IntakeReport, EngineError> {
        let run_id = RunId::new();
        let start = Instant::now();
        let mut report = IntakeReport::new(run_id, Utc::now());

        info!(
            %run_id,
            watched_dir = %self.watched_dir.display(),
            staging_dir = %self.staging_dir.display(),
            stability = self.stability.name(),
            "Starting intake run"
        );
        self.audit.log_run_start(run_id, &self.watched_dir).await;

        self.filesystem
            .ensure_dir(&self.staging_dir)
            .await
            .map_err(|e| EngineError::StagingUnavailable {
                path: self.staging_dir.clone(),
                message: format!("{e:#}"),
            })?;

        report.retained_before = self.warn_about_retained().await;

        let candidates = self
            .filesystem
            .list_candidates(&self.watched_dir)
            .await
            .map_err(|e| EngineError::ScanFailed {
                path: self.watched_dir.clone(),
                message: format!("{e:#}"),
            })?;
        info!(count = candidates.len(), "Found candidate files");

        for path in candidates {
            let outcome = self.process_file(run_id, &path, &mut report).await;
            debug!(path = %outcome.path().display(), outcome = outcome.label(), "File finished");
            report.outcomes.push(outcome);
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        self.audit
            .log_run_complete(
                run_id,
                report.duration_ms,
                report.cleaned(),
                report.skipped(),
                report.failed(),
            )
            .await;

        info!(
            %run_id,
            cleaned = report.cleaned(),
            skipped = report.skipped(),
            failed = report.failed(),
            alerts_failed = report.alerts_failed,
            duration_ms = report.duration_ms,
            "Intake run complete"
        );
        if report.failed() > 0 {
            warn!(
                failed = report.failed(),
                "Some staged files were retained; inspect them with `labintake staging list`"
            );
        }

        Ok(report)
    }

    /// Counts staged files left by earlier runs and warns about them
    async fn warn_about_retained(&self) -> usize {
        match self.filesystem.list_candidates(&self.staging_dir).await {
            Ok(retained) if !retained.is_empty() => {
                warn!(
                    count = retained.len(),
                    staging_dir = %self.staging_dir.display(),
                    "Staged files from earlier runs are awaiting recovery; \
                     use `labintake staging requeue` once the cause is fixed"
                );
                retained.len()
            }
            Ok(_) => 0,
            Err(e) => {
                warn!(error = %format!("{e:#}"), "Failed to list staging directory");
                0
            }
        }
    }

    /// Takes one candidate as far through the pipeline as it can go
    #[instrument(skip(self, report), fields(run_id = %run_id, path = %path.display()))]
    async fn process_file(
        &self,
        run_id: RunId,
        path: &Path,
        report: &mut IntakeReport,
    ) -> FileOutcome {
        debug!(stage = %IntakeStage::Discovered, "Processing candidate");

        let mut sample = match SampleFile::new(path) {
            Ok(sample) => sample,
            Err(e) => {
                let error = IntakeError::Stage {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                };
                return self.stage_failed(run_id, path, error).await;
            }
        };

        // Step 1: stability
        match self.stability.is_stable(path).await {
            Ok(true) => {}
            Ok(false) => {
                info!("File is still being written; leaving it for the next run");
                self.audit.log_file_skipped(run_id, path, None).await;
                return FileOutcome::SkippedUnstable {
                    path: path.to_path_buf(),
                    error: None,
                };
            }
            Err(e) => {
                let error = IntakeError::Stability {
                    path: path.to_path_buf(),
                    message: format!("{e:#}"),
                };
                warn!(error = %error, "Stability check failed; leaving file in place");
                self.audit.log_file_skipped(run_id, path, Some(&error)).await;
                return FileOutcome::SkippedUnstable {
                    path: path.to_path_buf(),
                    error: Some(error),
                };
            }
        }
        if let Ok(size) = self.filesystem.size(path).await {
            sample.set_discovered_size(size);
        }
        debug!(stage = %IntakeStage::StabilityConfirmed, size = ?sample.discovered_size(), "File is stable");

        // Step 2: stage
        let staged = sample.staging_target(&self.staging_dir);
        if let Err(e) = self.filesystem.stage(path, &staged).await {
            let error = IntakeError::Stage {
                path: path.to_path_buf(),
                message: format!("{e:#}"),
            };
            return self.stage_failed(run_id, path, error).await;
        }
        sample.mark_staged(staged.clone());
        info!(stage = %IntakeStage::Staged, staged = %staged.display(), "File staged");
        self.audit
            .log_file_staged(run_id, path, &staged, sample.discovered_size().unwrap_or(0))
            .await;

        // Step 3: validate
        let result = match self.filesystem.read(&staged).await {
            Ok(content) => validate_sample(&content),
            Err(e) => {
                let error = IntakeError::Unreadable {
                    path: staged.clone(),
                    message: format!("{e:#}"),
                };
                warn!(error = %error, "Staged file is unreadable; rejecting it");
                self.audit.log_error(Some(run_id), &staged, &error).await;
                ValidationResult::unreadable()
            }
        };
        info!(
            stage = %IntakeStage::Validated,
            valid = result.is_valid(),
            reason = result.reason(),
            "File validated"
        );
        self.audit.log_file_validated(run_id, &staged, &result).await;

        // Step 4: route
        let upload_start = Instant::now();
        let routed = match self
            .router
            .route(&staged, sample.object_key(), &result)
            .await
        {
            Ok(routed) => routed,
            Err(failure) => {
                error!(
                    error = %failure.error,
                    destination = %failure.destination,
                    staged = %staged.display(),
                    "Upload failed; staged copy retained for manual recovery"
                );
                self.audit
                    .log_error(Some(run_id), &staged, &failure.error)
                    .await;
                self.record_alert(run_id, &staged, failure.alert, report)
                    .await;
                return FileOutcome::RoutingFailed {
                    path: staged,
                    destination: failure.destination,
                    error: failure.error,
                };
            }
        };
        self.audit
            .log_file_uploaded(
                run_id,
                &staged,
                routed.destination,
                &routed.object,
                upload_start.elapsed().as_millis() as u64,
            )
            .await;
        debug!(stage = %IntakeStage::Routed, destination = %routed.destination, "File routed");

        self.record_alert(run_id, &staged, routed.alert, report).await;

        // Step 5: clean
        if let Err(e) = self.filesystem.remove(&staged).await {
            let error = IntakeError::Cleanup {
                path: staged.clone(),
                message: format!("{e:#}"),
            };
            error!(error = %error, "Uploaded, but the staged copy could not be removed");
            self.audit.log_error(Some(run_id), &staged, &error).await;
            return FileOutcome::CleanupFailed {
                path: staged,
                destination: routed.destination,
                error,
            };
        }
        info!(stage = %IntakeStage::Cleaned, destination = %routed.destination, "File done");
        self.audit.log_file_cleaned(run_id, &staged).await;

        FileOutcome::Cleaned {
            path: path.to_path_buf(),
            destination: routed.destination,
        }
    }

    /// Audits and counts the rejection alert of one file
    async fn record_alert(
        &self,
        run_id: RunId,
        staged: &Path,
        alert: AlertStatus,
        report: &mut IntakeReport,
    ) {
        match alert {
            AlertStatus::Sent => {
                report.alerts_sent += 1;
                self.audit
                    .log_notification_sent(run_id, staged, self.router.recipient())
                    .await;
            }
            AlertStatus::Failed(error) => {
                report.alerts_failed += 1;
                self.audit.log_error(Some(run_id), staged, &error).await;
            }
            AlertStatus::Disabled => {
                debug!("Rejection alerts are disabled");
            }
            AlertStatus::NotNeeded => {}
        }
    }

    async fn stage_failed(&self, run_id: RunId, path: &Path, error: IntakeError) -> FileOutcome {
        warn!(error = %error, "Failed to stage file; leaving it for the next run");
        self.audit.log_error(Some(run_id), path, &error).await;
        FileOutcome::StageFailed {
            path: path.to_path_buf(),
            error,
        }
    }
}
