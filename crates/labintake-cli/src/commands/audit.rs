//! Audit command - show the tail of the audit trail

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;
use labintake_audit::JsonlAuditSink;
use labintake_core::domain::AuditResult;
use labintake_core::ports::IAuditSink;

use super::CommandContext;

#[derive(Debug, Args)]
pub struct AuditCommand {
    /// Number of entries to show
    #[arg(long, short = 'n', default_value_t = 20)]
    pub limit: usize,
}

impl AuditCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<ExitCode> {
        let fmt = ctx.formatter();
        let config = ctx.config()?;
        let sink = JsonlAuditSink::new(&config.logging.audit_file);

        let entries = sink
            .recent(self.limit)
            .await
            .with_context(|| format!("Failed to read {}", sink.path().display()))?;

        if ctx.is_json() {
            let json = serde_json::to_value(&entries).context("Failed to serialize entries")?;
            fmt.print_json(&json);
            return Ok(ExitCode::SUCCESS);
        }

        if entries.is_empty() {
            fmt.info(&format!("No audit entries in {}", sink.path().display()));
            return Ok(ExitCode::SUCCESS);
        }

        for entry in &entries {
            let result = match entry.result() {
                AuditResult::Success => "ok".to_string(),
                AuditResult::Failed { code, message } => format!("{code}: {message}"),
            };
            fmt.info(&format!(
                "{}  {:<18} {}  {}",
                entry.timestamp().format("%Y-%m-%d %H:%M:%S"),
                entry.action().to_string(),
                entry.path().unwrap_or("-"),
                result
            ));
        }

        Ok(ExitCode::SUCCESS)
    }
}
