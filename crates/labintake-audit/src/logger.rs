//! AuditLogger - high-level audit logging service
//!
//! Wraps `IAuditSink::append()` with convenience methods for each
//! auditable step of an intake run. All methods are non-fatal: errors
//! in audit persistence are logged via `tracing::warn!` but never propagated.

use std::path::Path;
use std::sync::Arc;

use labintake_core::{
    domain::{
        audit::{AuditAction, AuditEntry, AuditResult, RunId},
        Destination, IntakeError, ValidationResult,
    },
    ports::{audit_sink::IAuditSink, StoredObject},
};
use serde_json::json;

use crate::reason::ReasonCode;

/// High-level audit logger over an [`IAuditSink`].
///
/// All methods silently swallow errors (logging a warning) so that audit
/// failures never change how a file is processed.
pub struct AuditLogger {
    sink: Arc<dyn IAuditSink>,
}

impl AuditLogger {
    /// Creates a new `AuditLogger` backed by the given sink.
    pub fn new(sink: Arc<dyn IAuditSink>) -> Self {
        Self { sink }
    }

    /// Persist an audit entry, swallowing errors with a tracing warning.
    async fn save(&self, entry: &AuditEntry) {
        if let Err(e) = self.sink.append(entry).await {
            tracing::warn!(error = %e, action = %entry.action(), "Failed to save audit entry");
        }
    }

    // ========================================================================
    // Run lifecycle
    // ========================================================================

    /// Log the start of an intake run.
    pub async fn log_run_start(&self, run_id: RunId, watched_dir: &Path) {
        let entry = AuditEntry::new(AuditAction::RunStart, AuditResult::success())
            .with_run_id(run_id)
            .with_details(json!({
                "watched_dir": watched_dir.display().to_string(),
            }));
        self.save(&entry).await;
    }

    /// Log the end of an intake run with its outcome counts.
    pub async fn log_run_complete(
        &self,
        run_id: RunId,
        duration_ms: u64,
        cleaned: usize,
        skipped: usize,
        failed: usize,
    ) {
        let entry = AuditEntry::new(AuditAction::RunComplete, AuditResult::success())
            .with_run_id(run_id)
            .with_duration_ms(duration_ms)
            .with_details(json!({
                "files_cleaned": cleaned,
                "files_skipped": skipped,
                "files_failed": failed,
            }));
        self.save(&entry).await;
    }

    // ========================================================================
    // File steps
    // ========================================================================

    /// Log a candidate left in place because it was not confirmed stable.
    pub async fn log_file_skipped(&self, run_id: RunId, path: &Path, error: Option<&IntakeError>) {
        let (result, reason) = match error {
            Some(e) => (
                AuditResult::failed(e.code(), e.to_string()),
                ReasonCode::for_error(e),
            ),
            None => (AuditResult::success(), ReasonCode::StillBeingWritten),
        };
        let entry = AuditEntry::new(AuditAction::FileSkipped, result)
            .with_run_id(run_id)
            .with_path(path.display().to_string())
            .with_details(json!({ "reason": reason }));
        self.save(&entry).await;
    }

    /// Log a file moved into staging.
    pub async fn log_file_staged(&self, run_id: RunId, source: &Path, staged: &Path, size: u64) {
        let entry = AuditEntry::new(AuditAction::FileStaged, AuditResult::success())
            .with_run_id(run_id)
            .with_path(source.display().to_string())
            .with_details(json!({
                "staged_path": staged.display().to_string(),
                "size_bytes": size,
            }));
        self.save(&entry).await;
    }

    /// Log the validation verdict for a staged file.
    pub async fn log_file_validated(&self, run_id: RunId, staged: &Path, result: &ValidationResult) {
        let entry = AuditEntry::new(AuditAction::FileValidated, AuditResult::success())
            .with_run_id(run_id)
            .with_path(staged.display().to_string())
            .with_details(json!({
                "valid": result.is_valid(),
                "reason": result.reason(),
            }));
        self.save(&entry).await;
    }

    /// Log a confirmed upload.
    pub async fn log_file_uploaded(
        &self,
        run_id: RunId,
        staged: &Path,
        destination: Destination,
        object: &StoredObject,
        duration_ms: u64,
    ) {
        let entry = AuditEntry::new(AuditAction::FileUploaded, AuditResult::success())
            .with_run_id(run_id)
            .with_path(staged.display().to_string())
            .with_duration_ms(duration_ms)
            .with_details(json!({
                "destination": destination,
                "bucket": object.bucket,
                "key": object.key,
                "size_bytes": object.size,
            }));
        self.save(&entry).await;
    }

    /// Log removal of a staged copy after its upload.
    pub async fn log_file_cleaned(&self, run_id: RunId, staged: &Path) {
        let entry = AuditEntry::new(AuditAction::FileCleaned, AuditResult::success())
            .with_run_id(run_id)
            .with_path(staged.display().to_string());
        self.save(&entry).await;
    }

    /// Log a delivered rejection alert.
    pub async fn log_notification_sent(&self, run_id: RunId, staged: &Path, recipient: &str) {
        let entry = AuditEntry::new(AuditAction::NotificationSent, AuditResult::success())
            .with_run_id(run_id)
            .with_path(staged.display().to_string())
            .with_details(json!({ "recipient": recipient }));
        self.save(&entry).await;
    }

    /// Log a retained staged file moved back into the watched directory.
    pub async fn log_file_requeued(&self, staged: &Path, target: &Path) {
        let entry = AuditEntry::new(AuditAction::FileRequeued, AuditResult::success())
            .with_path(staged.display().to_string())
            .with_details(json!({ "target": target.display().to_string() }));
        self.save(&entry).await;
    }

    // ========================================================================
    // Errors
    // ========================================================================

    /// Log a failed step for one file.
    pub async fn log_error(&self, run_id: Option<RunId>, path: &Path, error: &IntakeError) {
        let mut entry = AuditEntry::new(
            AuditAction::Error,
            AuditResult::failed(error.code(), error.to_string()),
        )
        .with_path(path.display().to_string())
        .with_details(json!({
            "reason": ReasonCode::for_error(error),
            "retried_next_run": error.is_retried_next_run(),
        }));
        if let Some(run_id) = run_id {
            entry = entry.with_run_id(run_id);
        }
        self.save(&entry).await;
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use labintake_core::ports::UploadError;

    use super::*;

    /// In-memory mock sink that records appended entries
    struct MockSink {
        entries: Mutex<Vec<AuditEntry>>,
    }

    impl MockSink {
        fn new() -> Self {
            Self {
                entries: Mutex::new(Vec::new()),
            }
        }

        fn entries(&self) -> Vec<AuditEntry> {
            self.entries.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl IAuditSink for MockSink {
        async fn append(&self, entry: &AuditEntry) -> anyhow::Result<()> {
            self.entries.lock().unwrap().push(entry.clone());
            Ok(())
        }

        async fn recent(&self, limit: usize) -> anyhow::Result<Vec<AuditEntry>> {
            let entries = self.entries();
            let start = entries.len().saturating_sub(limit);
            Ok(entries[start..].to_vec())
        }
    }

    #[tokio::test]
    async fn test_log_run_start() {
        let sink = Arc::new(MockSink::new());
        let logger = AuditLogger::new(sink.clone());
        let run_id = RunId::new();

        logger.log_run_start(run_id, Path::new("/data/in")).await;

        let entries = sink.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action(), AuditAction::RunStart);
        assert_eq!(entries[0].run_id(), Some(&run_id));
        assert_eq!(entries[0].details()["watched_dir"], "/data/in");
    }

    #[tokio::test]
    async fn test_log_run_complete() {
        let sink = Arc::new(MockSink::new());
        let logger = AuditLogger::new(sink.clone());

        logger.log_run_complete(RunId::new(), 1500, 3, 1, 1).await;

        let entries = sink.entries();
        assert_eq!(entries[0].action(), AuditAction::RunComplete);
        assert_eq!(entries[0].duration_ms(), Some(1500));
        assert_eq!(entries[0].details()["files_cleaned"], 3);
    }

    #[tokio::test]
    async fn test_log_file_skipped_unstable() {
        let sink = Arc::new(MockSink::new());
        let logger = AuditLogger::new(sink.clone());

        logger
            .log_file_skipped(RunId::new(), Path::new("/in/a.json"), None)
            .await;

        let entries = sink.entries();
        assert_eq!(entries[0].action(), AuditAction::FileSkipped);
        assert!(entries[0].result().is_success());
        assert_eq!(entries[0].details()["reason"], "still_being_written");
    }

    #[tokio::test]
    async fn test_log_file_validated() {
        let sink = Arc::new(MockSink::new());
        let logger = AuditLogger::new(sink.clone());
        let result = ValidationResult::invalid("Missing or empty fields: sample_id");

        logger
            .log_file_validated(RunId::new(), Path::new("/staging/b.json"), &result)
            .await;

        let entries = sink.entries();
        assert_eq!(entries[0].details()["valid"], false);
        assert_eq!(
            entries[0].details()["reason"],
            "Missing or empty fields: sample_id"
        );
    }

    #[tokio::test]
    async fn test_log_file_uploaded() {
        let sink = Arc::new(MockSink::new());
        let logger = AuditLogger::new(sink.clone());
        let object = StoredObject {
            bucket: "lab-valid".into(),
            key: "a.json".into(),
            size: 64,
            generation: Some("1".into()),
        };

        logger
            .log_file_uploaded(
                RunId::new(),
                Path::new("/staging/a.json"),
                Destination::Accepted,
                &object,
                20,
            )
            .await;

        let entries = sink.entries();
        assert_eq!(entries[0].action(), AuditAction::FileUploaded);
        assert_eq!(entries[0].details()["destination"], "accepted");
        assert_eq!(entries[0].details()["bucket"], "lab-valid");
    }

    #[tokio::test]
    async fn test_log_error() {
        let sink = Arc::new(MockSink::new());
        let logger = AuditLogger::new(sink.clone());
        let error = IntakeError::Upload {
            bucket: "lab-valid".into(),
            key: "a.json".into(),
            source: UploadError::Transport("connection reset".into()),
        };

        logger
            .log_error(None, &PathBuf::from("/staging/a.json"), &error)
            .await;

        let entries = sink.entries();
        assert_eq!(entries[0].action(), AuditAction::Error);
        assert!(entries[0].result().is_failed());
        assert!(entries[0].run_id().is_none());
        assert_eq!(entries[0].details()["reason"], "network_failure");
        assert_eq!(entries[0].details()["retried_next_run"], false);
    }

    #[tokio::test]
    async fn test_audit_failure_is_non_fatal() {
        // A sink that always fails on append
        struct FailingSink;

        #[async_trait]
        impl IAuditSink for FailingSink {
            async fn append(&self, _: &AuditEntry) -> anyhow::Result<()> {
                anyhow::bail!("disk full")
            }
            async fn recent(&self, _: usize) -> anyhow::Result<Vec<AuditEntry>> {
                Ok(vec![])
            }
        }

        let logger = AuditLogger::new(Arc::new(FailingSink));

        // This should NOT panic or return an error
        logger.log_run_start(RunId::new(), Path::new("/in")).await;
        logger
            .log_file_cleaned(RunId::new(), Path::new("/staging/a.json"))
            .await;
        logger
            .log_error(
                None,
                Path::new("/x"),
                &IntakeError::Notification("down".into()),
            )
            .await;
    }
}
