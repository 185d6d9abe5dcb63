//! Tracing subscriber setup
//!
//! Runs are started by a scheduler with nobody watching the terminal, so
//! logs go to the append-only file named in `logging.file` unless
//! `--stderr` is given.

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use labintake_core::config::LoggingConfig;
use tracing_subscriber::EnvFilter;

/// Level filter for the given verbosity; `RUST_LOG` overrides it
fn level_for(settings: &LoggingConfig, verbose: u8) -> String {
    match verbose {
        0 => settings.level.clone(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

/// Opens the log file for appending, creating its directory first
fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))
}

/// Installs the global subscriber
pub fn init(settings: &LoggingConfig, verbose: u8, to_stderr: bool) {
    let level = level_for(settings, verbose);
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));

    if to_stderr {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
        return;
    }

    match open_log_file(&settings.file) {
        Ok(file) => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        Err(e) => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
            tracing::warn!(
                path = %settings.file.display(),
                error = %format!("{e:#}"),
                "Cannot open log file; logging to stderr"
            );
        }
    }
}
