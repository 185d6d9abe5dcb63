//! Config command - view, validate and create the configuration
//!
//! Provides the `labintake config` CLI command which:
//! 1. Shows the effective configuration (YAML or JSON)
//! 2. Validates the configuration file and reports every problem
//! 3. Writes a default configuration file to start from

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Subcommand;
use labintake_core::config::Config;
use tracing::info;

use super::CommandContext;

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display the effective configuration
    Show,
    /// Validate the configuration file
    Validate,
    /// Write a default configuration file
    Init {
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}

impl ConfigCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<ExitCode> {
        match self {
            ConfigCommand::Show => self.execute_show(ctx),
            ConfigCommand::Validate => self.execute_validate(ctx),
            ConfigCommand::Init { force } => self.execute_init(ctx, *force),
        }
    }

    fn execute_show(&self, ctx: &CommandContext) -> Result<ExitCode> {
        let fmt = ctx.formatter();
        let config = ctx.config()?;

        if ctx.is_json() {
            let json = serde_json::to_value(config)
                .context("Failed to serialize configuration to JSON")?;
            fmt.print_json(&json);
        } else {
            let source = if ctx.config_path.exists() {
                ctx.config_path.display().to_string()
            } else {
                format!("defaults; {} does not exist", ctx.config_path.display())
            };
            fmt.success(&format!("Configuration ({source})"));
            fmt.info("");
            for line in config.to_yaml()?.lines() {
                fmt.info(line);
            }
        }

        Ok(ExitCode::SUCCESS)
    }

    fn execute_validate(&self, ctx: &CommandContext) -> Result<ExitCode> {
        let fmt = ctx.formatter();
        let problems = collect_problems(&ctx.config_path);

        if ctx.is_json() {
            fmt.print_json(&serde_json::json!({
                "valid": problems.is_empty(),
                "config_path": ctx.config_path.display().to_string(),
                "errors": problems,
            }));
        } else if problems.is_empty() {
            fmt.success(&format!("{} is valid", ctx.config_path.display()));
        } else {
            fmt.error(&format!(
                "{} has {} problem(s):",
                ctx.config_path.display(),
                problems.len()
            ));
            for problem in &problems {
                fmt.info(problem);
            }
        }

        Ok(if problems.is_empty() {
            ExitCode::SUCCESS
        } else {
            ExitCode::from(1)
        })
    }

    fn execute_init(&self, ctx: &CommandContext, force: bool) -> Result<ExitCode> {
        let fmt = ctx.formatter();
        let path = &ctx.config_path;

        if path.exists() && !force {
            anyhow::bail!(
                "{} already exists; pass --force to replace it",
                path.display()
            );
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create configuration directory")?;
        }
        let yaml = Config::default().to_yaml()?;
        std::fs::write(path, yaml).context("Failed to write configuration file")?;
        info!(path = %path.display(), "Wrote default configuration");

        if ctx.is_json() {
            fmt.print_json(&serde_json::json!({
                "success": true,
                "config_path": path.display().to_string(),
            }));
        } else {
            fmt.success(&format!("Wrote {}", path.display()));
            fmt.info("Set storage.accepted_bucket, storage.rejected_bucket and storage.region,");
            fmt.info("then notify.recipient and auth.client_id, and run `labintake auth login --for mail`.");
            fmt.info("S3 uploads use the standard AWS credentials (environment, ~/.aws, instance role).");
        }

        Ok(ExitCode::SUCCESS)
    }
}

/// Loads the file on disk (not the defaults) and lists everything wrong with it
fn collect_problems(path: &Path) -> Vec<String> {
    match Config::load(path) {
        Ok(config) => config.validate().iter().map(ToString::to_string).collect(),
        Err(e) => vec![format!("cannot load {}: {e:#}", path.display())],
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::output::OutputFormat;

    #[tokio::test]
    async fn test_init_writes_loadable_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("labintake").join("config.yaml");
        let ctx = CommandContext::load(path.clone(), OutputFormat::Json);

        ConfigCommand::Init { force: false }
            .execute(&ctx)
            .await
            .unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.intake.quiescence_secs, 5);
    }

    #[tokio::test]
    async fn test_init_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "logging:\n  level: debug\n").unwrap();
        let ctx = CommandContext::load(path.clone(), OutputFormat::Json);

        assert!(ConfigCommand::Init { force: false }
            .execute(&ctx)
            .await
            .is_err());
        assert!(std::fs::read_to_string(&path).unwrap().contains("debug"));

        ConfigCommand::Init { force: true }
            .execute(&ctx)
            .await
            .unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("info"));
    }

    #[test]
    fn test_collect_problems() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");

        let missing = collect_problems(&path);
        assert_eq!(missing.len(), 1);
        assert!(missing[0].starts_with("cannot load"));

        std::fs::write(&path, "intake:\n  quiescence_secs: 0\n").unwrap();
        let problems = collect_problems(&path);
        assert!(problems
            .iter()
            .any(|p| p.starts_with("intake.quiescence_secs")));
    }
}
