//! Subcommand implementations
//!
//! Every command receives a [`CommandContext`] carrying the configuration
//! file path, the loaded configuration and the output format.

pub mod audit;
pub mod auth;
pub mod check;
pub mod config;
pub mod run;
pub mod staging;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use labintake_cloud::auth::{OAuthConfig, OAuthCredentialProvider, TokenFileStorage, TokenPurpose};
use labintake_core::config::{Config, LoggingConfig};
use labintake_core::ports::ICredentialProvider;
use tracing::debug;

use crate::output::{get_formatter, OutputFormat, OutputFormatter};

/// Shared state handed to every command
pub struct CommandContext {
    pub config_path: PathBuf,
    config: Result<Config>,
    pub format: OutputFormat,
}

impl CommandContext {
    /// Loads the configuration at `config_path`
    ///
    /// A missing file yields the defaults. A file that exists but cannot be
    /// parsed is kept as an error so only the commands that need the
    /// configuration fail.
    pub fn load(config_path: PathBuf, format: OutputFormat) -> Self {
        let config = load_config(&config_path);
        Self {
            config_path,
            config,
            format,
        }
    }

    /// The loaded configuration
    pub fn config(&self) -> Result<&Config> {
        self.config.as_ref().map_err(|e| anyhow!("{e:#}"))
    }

    /// Logging settings, falling back to defaults when the config is broken
    pub fn logging_settings(&self) -> LoggingConfig {
        self.config
            .as_ref()
            .map(|c| c.logging.clone())
            .unwrap_or_default()
    }

    pub fn formatter(&self) -> Box<dyn OutputFormatter> {
        get_formatter(self.format)
    }

    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }
}

fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        debug!(path = %path.display(), "No configuration file; using defaults");
        return Ok(Config::default());
    }
    Config::load(path).with_context(|| format!("Failed to load configuration from {}", path.display()))
}

/// Token file holding the grant for `purpose`
pub fn token_storage(config: &Config, purpose: TokenPurpose) -> TokenFileStorage {
    let path = match purpose {
        TokenPurpose::Mail => &config.notify.token_file,
        TokenPurpose::Storage => &config.storage.token_file,
    };
    TokenFileStorage::new(path)
}

/// Non-interactive credentials for `purpose`
///
/// Without a configured OAuth client the persisted token is still used, but
/// it cannot be refreshed once it expires.
pub fn credential_provider(config: &Config, purpose: TokenPurpose) -> Arc<dyn ICredentialProvider> {
    let oauth = match OAuthConfig::from_settings(&config.auth, purpose) {
        Ok(oauth) => Some(oauth),
        Err(e) => {
            tracing::warn!(%purpose, error = %e, "Token refresh unavailable");
            None
        }
    };
    Arc::new(OAuthCredentialProvider::new(token_storage(config, purpose), oauth))
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_missing_config_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let ctx = CommandContext::load(dir.path().join("config.yaml"), OutputFormat::Human);
        let config = ctx.config().unwrap();
        assert_eq!(config.intake.quiescence_secs, 5);
    }

    #[test]
    fn test_broken_config_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "intake: [unterminated").unwrap();

        let ctx = CommandContext::load(path, OutputFormat::Json);
        assert!(ctx.config().is_err());
        assert!(ctx.is_json());
        assert_eq!(ctx.logging_settings().level, "info");
    }

    #[test]
    fn test_token_storage_per_purpose() {
        let config = Config::default();
        assert_eq!(
            token_storage(&config, TokenPurpose::Mail).path(),
            config.notify.token_file.as_path()
        );
        assert_eq!(
            token_storage(&config, TokenPurpose::Storage).path(),
            config.storage.token_file.as_path()
        );
    }
}
