//! Staging commands - manual recovery of retained staged files
//!
//! A staged file survives a run only when its upload or the delete after
//! it failed. `list` shows those files; `requeue` moves them back into the
//! watched directory so the next run takes them through the whole pipeline
//! again.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Subcommand;
use labintake_audit::{AuditLogger, JsonlAuditSink};
use labintake_local::StagingArea;

use super::CommandContext;

#[derive(Debug, Subcommand)]
pub enum StagingCommand {
    /// List staged files retained by earlier runs
    List,
    /// Move retained files back into the watched directory
    Requeue {
        /// File to move; all retained files when omitted
        name: Option<String>,
    },
}

impl StagingCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<ExitCode> {
        let config = ctx.config()?;
        let area = StagingArea::new(&config.intake.staging_dir, &config.intake.watched_dir);

        match self {
            StagingCommand::List => self.execute_list(ctx, &area).await,
            StagingCommand::Requeue { name } => {
                let audit =
                    AuditLogger::new(Arc::new(JsonlAuditSink::new(&config.logging.audit_file)));
                self.execute_requeue(ctx, &area, &audit, name.as_deref())
                    .await
            }
        }
    }

    async fn execute_list(&self, ctx: &CommandContext, area: &StagingArea) -> Result<ExitCode> {
        let fmt = ctx.formatter();
        let retained = area
            .list_retained()
            .await
            .context("Failed to list the staging directory")?;

        if ctx.is_json() {
            let json = serde_json::to_value(&retained)
                .context("Failed to serialize retained files")?;
            fmt.print_json(&json);
            return Ok(ExitCode::SUCCESS);
        }

        if retained.is_empty() {
            fmt.success(&format!(
                "Nothing retained in {}",
                area.staging_dir().display()
            ));
            return Ok(ExitCode::SUCCESS);
        }

        fmt.warn(&format!(
            "{} file(s) retained in {}",
            retained.len(),
            area.staging_dir().display()
        ));
        for file in &retained {
            let modified = file
                .modified
                .map(|m| m.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "-".to_string());
            fmt.info(&format!("{:<40} {:>10} B  {}", file.name, file.size, modified));
        }
        fmt.info("");
        fmt.info("Fix the cause (see the log file), then run `labintake staging requeue`.");

        Ok(ExitCode::SUCCESS)
    }

    async fn execute_requeue(
        &self,
        ctx: &CommandContext,
        area: &StagingArea,
        audit: &AuditLogger,
        name: Option<&str>,
    ) -> Result<ExitCode> {
        let fmt = ctx.formatter();

        let moved = match name {
            Some(name) => vec![area
                .requeue(name)
                .await
                .with_context(|| format!("Failed to requeue {name}"))?],
            None => area
                .requeue_all()
                .await
                .context("Failed to requeue retained files")?,
        };

        for target in &moved {
            if let Some(file_name) = target.file_name() {
                audit
                    .log_file_requeued(&area.staging_dir().join(file_name), target)
                    .await;
            }
        }

        if ctx.is_json() {
            let targets: Vec<String> = moved.iter().map(|p| p.display().to_string()).collect();
            fmt.print_json(&serde_json::json!({ "requeued": targets }));
        } else if moved.is_empty() {
            fmt.success("Nothing to requeue");
        } else {
            fmt.success(&format!("Requeued {} file(s)", moved.len()));
            for target in &moved {
                fmt.info(&target.display().to_string());
            }
        }

        Ok(ExitCode::SUCCESS)
    }
}
