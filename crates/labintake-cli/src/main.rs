//! LabIntake CLI - Command-line interface for LabIntake
//!
//! Provides commands for:
//! - Running one intake pass (the default, meant for a scheduler)
//! - Validating a sample file offline
//! - Viewing, validating and creating the configuration
//! - Authorizing mail and storage access
//! - Inspecting and requeueing retained staged files
//! - Reading the audit trail

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod logging;
mod output;

use commands::{
    audit::AuditCommand, auth::AuthCommand, check::CheckCommand, config::ConfigCommand,
    run::RunCommand, staging::StagingCommand, CommandContext,
};
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(
    name = "labintake",
    version,
    about = "Validate lab sample files and route them to cloud storage"
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose logging (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log to stderr instead of the configured log file
    #[arg(long, global = true)]
    stderr: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Process every completed file in the watched directory once (default)
    Run(RunCommand),
    /// Validate a sample file without uploading it
    Check(CheckCommand),
    /// View and manage configuration
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Authorize mail and storage access
    #[command(subcommand)]
    Auth(AuthCommand),
    /// Inspect and requeue staged files retained after a failure
    #[command(subcommand)]
    Staging(StagingCommand),
    /// Show recent audit trail entries
    Audit(AuditCommand),
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(labintake_core::config::Config::default_path);
    let ctx = CommandContext::load(
        config_path,
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        },
    );

    logging::init(&ctx.logging_settings(), cli.verbose, cli.stderr);

    match cli.command.unwrap_or_default() {
        Commands::Run(cmd) => cmd.execute(&ctx).await,
        Commands::Check(cmd) => cmd.execute(&ctx).await,
        Commands::Config(cmd) => cmd.execute(&ctx).await,
        Commands::Auth(cmd) => cmd.execute(&ctx).await,
        Commands::Staging(cmd) => cmd.execute(&ctx).await,
        Commands::Audit(cmd) => cmd.execute(&ctx).await,
    }
}

impl Default for Commands {
    fn default() -> Self {
        Commands::Run(RunCommand::default())
    }
}
