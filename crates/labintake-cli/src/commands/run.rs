//! Run command - one intake pass over the watched directory
//!
//! Wires the adapters from the configuration, performs exactly one pass
//! and prints the run summary. Meant to be started by cron or a systemd
//! timer; runs must not overlap.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use labintake_audit::{AuditLogger, JsonlAuditSink};
use labintake_cloud::auth::TokenPurpose;
use labintake_cloud::mail::GmailNotifier;
use labintake_cloud::s3::S3ObjectStore;
use labintake_cloud::storage::{HttpObjectStore, DEFAULT_STORAGE_ENDPOINT};
use labintake_core::config::{Config, StabilityMode, StorageProvider};
use labintake_core::domain::FileOutcome;
use labintake_core::ports::{
    INotificationGateway, IObjectStore, ISampleFileSystem, IStabilityStrategy,
};
use labintake_core::usecases::{NotifySettings, SampleRouter};
use labintake_engine::{IntakeOrchestrator, IntakeReport};
use labintake_local::{ChecksumQuiescenceChecker, LocalSampleFileSystem, SizeQuiescenceChecker};
use tracing::info;

use super::{credential_provider, CommandContext};

#[derive(Debug, Default, Args)]
pub struct RunCommand {}

impl RunCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<ExitCode> {
        let fmt = ctx.formatter();
        let config = ctx.config()?;

        let issues = config.validate();
        if !issues.is_empty() {
            for issue in &issues {
                fmt.error(&issue.to_string());
            }
            anyhow::bail!(
                "Configuration {} has {} problem(s); see `labintake config validate`",
                ctx.config_path.display(),
                issues.len()
            );
        }

        let orchestrator = build_orchestrator(config).await?;
        info!(config_path = %ctx.config_path.display(), "Intake run requested");
        let report = orchestrator.run_once().await.context("Intake run failed")?;

        if ctx.is_json() {
            let json = serde_json::to_value(report.summary())
                .context("Failed to serialize run summary")?;
            fmt.print_json(&json);
        } else {
            print_report(&report, fmt.as_ref());
        }

        Ok(ExitCode::SUCCESS)
    }
}

/// Builds the orchestrator and its adapters from the configuration
pub async fn build_orchestrator(config: &Config) -> Result<IntakeOrchestrator> {
    let filesystem: Arc<dyn ISampleFileSystem> = Arc::new(LocalSampleFileSystem::new());
    let window = config.intake.quiescence();
    let stability: Arc<dyn IStabilityStrategy> = match config.intake.stability {
        StabilityMode::Size => Arc::new(SizeQuiescenceChecker::new(window)),
        StabilityMode::Checksum => Arc::new(ChecksumQuiescenceChecker::new(window)),
    };

    let storage = &config.storage;
    let store: Arc<dyn IObjectStore> = match storage.provider {
        StorageProvider::S3 => Arc::new(
            S3ObjectStore::from_environment(
                storage.region.as_deref(),
                storage.endpoint.as_deref(),
                storage.overwrite,
            )
            .await,
        ),
        StorageProvider::Gcs => Arc::new(
            HttpObjectStore::new(
                storage.endpoint.as_deref().unwrap_or(DEFAULT_STORAGE_ENDPOINT),
                credential_provider(config, TokenPurpose::Storage),
                storage.overwrite,
            )
            .context("Invalid storage.endpoint")?,
        ),
    };

    let notifier: Option<Arc<dyn INotificationGateway>> = if config.notify.enabled {
        let gmail = GmailNotifier::new(
            &config.notify.api_base,
            credential_provider(config, TokenPurpose::Mail),
            config.notify.sender.clone(),
        )
        .context("Invalid notify.api_base")?;
        Some(Arc::new(gmail))
    } else {
        None
    };

    let router = SampleRouter::new(
        store,
        notifier,
        config.buckets(),
        NotifySettings {
            recipient: config.notify.recipient.clone(),
            subject: config.notify.subject.clone(),
        },
    );
    let audit = AuditLogger::new(Arc::new(JsonlAuditSink::new(&config.logging.audit_file)));

    Ok(IntakeOrchestrator::new(
        filesystem,
        stability,
        router,
        audit,
        &config.intake.watched_dir,
        &config.intake.staging_dir,
    ))
}

fn print_report(report: &IntakeReport, fmt: &dyn crate::output::OutputFormatter) {
    use labintake_core::domain::Destination;

    fmt.success(&format!(
        "Intake run {} finished in {} ms",
        report.run_id, report.duration_ms
    ));
    fmt.field("discovered", &report.outcomes.len());
    fmt.field(
        "cleaned",
        &format!(
            "{} ({} accepted, {} rejected)",
            report.cleaned(),
            report.routed_to(Destination::Accepted),
            report.routed_to(Destination::Rejected)
        ),
    );
    fmt.field("left in place", &report.skipped());
    fmt.field("retained", &report.failed());
    fmt.field(
        "alerts",
        &format!("{} sent, {} failed", report.alerts_sent, report.alerts_failed),
    );

    for outcome in &report.outcomes {
        if matches!(outcome, FileOutcome::Cleaned { .. }) {
            continue;
        }
        let detail = outcome
            .error()
            .map(|e| format!(" ({e})"))
            .unwrap_or_default();
        fmt.info(&format!(
            "{}: {}{}",
            outcome.label(),
            outcome.path().display(),
            detail
        ));
    }

    if report.failed() > 0 || report.retained_before > 0 {
        fmt.warn(&format!(
            "{} staged file(s) await recovery; see `labintake staging list`",
            report.failed() + report.retained_before
        ));
    }
    if report.alerts_failed > 0 {
        fmt.warn("Some rejection alerts could not be sent; check `labintake auth status`");
    }
}

#[cfg(test)]
mod tests {
    use labintake_core::config::ConfigBuilder;
    use tempfile::TempDir;

    use super::*;

    #[tokio::test]
    async fn test_build_orchestrator_from_config() {
        let dir = TempDir::new().unwrap();
        let config = ConfigBuilder::new()
            .watched_dir(dir.path().join("incoming"))
            .staging_dir(dir.path().join("staging"))
            .buckets("lab-accepted", "lab-rejected")
            .storage_region("il-central-1")
            .storage_endpoint("http://127.0.0.1:9000")
            .notify_enabled(false)
            .build();

        let orchestrator = build_orchestrator(&config).await.unwrap();
        assert_eq!(orchestrator.watched_dir(), dir.path().join("incoming"));
        assert_eq!(orchestrator.staging_dir(), dir.path().join("staging"));
    }

    #[tokio::test]
    async fn test_build_orchestrator_rejects_bad_endpoint() {
        let config = ConfigBuilder::new()
            .storage_provider(StorageProvider::Gcs)
            .storage_endpoint("not a url")
            .build();
        assert!(build_orchestrator(&config).await.is_err());
    }
}
