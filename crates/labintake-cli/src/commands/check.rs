//! Check command - validate a sample file offline
//!
//! Applies the same rule a run applies, without staging, uploading or
//! alerting. Exits with status 1 when the sample would be rejected.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;
use labintake_core::domain::validate_sample;

use super::CommandContext;

#[derive(Debug, Args)]
pub struct CheckCommand {
    /// Sample file to validate
    pub file: PathBuf,
}

impl CheckCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<ExitCode> {
        let fmt = ctx.formatter();
        let content = tokio::fs::read(&self.file)
            .await
            .with_context(|| format!("Failed to read {}", self.file.display()))?;

        let result = validate_sample(&content);

        if ctx.is_json() {
            fmt.print_json(&serde_json::json!({
                "file": self.file.display().to_string(),
                "valid": result.is_valid(),
                "reason": result.reason(),
            }));
        } else if result.is_valid() {
            fmt.success(&format!("{} is valid", self.file.display()));
        } else {
            fmt.error(&format!(
                "{} would be rejected: {}",
                self.file.display(),
                result.reason()
            ));
        }

        Ok(if result.is_valid() {
            ExitCode::SUCCESS
        } else {
            ExitCode::from(1)
        })
    }
}
