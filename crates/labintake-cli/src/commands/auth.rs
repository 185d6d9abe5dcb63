//! Auth commands - Login, Logout, and Status for the mail and storage grants
//!
//! Provides the `labintake auth` CLI subcommands which:
//! 1. `login`  - Runs the OAuth2 PKCE flow in the browser and stores the
//!    token file for the chosen purpose.
//! 2. `logout` - Deletes the token file.
//! 3. `status` - Shows whether a token exists and when it expires.
//!
//! Runs never prompt; they only use what `login` stored.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Subcommand, ValueEnum};
use labintake_cloud::auth::{OAuthConfig, OAuthLogin, TokenPurpose};
use labintake_core::config::StorageProvider;
use tracing::info;

use super::{token_storage, CommandContext};

/// Which grant a command acts on
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Purpose {
    /// Sending rejection alerts
    Mail,
    /// Uploading samples to Google Cloud Storage buckets
    Storage,
}

impl From<Purpose> for TokenPurpose {
    fn from(purpose: Purpose) -> Self {
        match purpose {
            Purpose::Mail => TokenPurpose::Mail,
            Purpose::Storage => TokenPurpose::Storage,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    /// Authorize access in the browser and store the token
    Login {
        /// Grant to obtain
        #[arg(long = "for", value_enum)]
        purpose: Purpose,
    },
    /// Delete a stored token
    Logout {
        /// Grant to remove
        #[arg(long = "for", value_enum)]
        purpose: Purpose,
    },
    /// Show stored tokens
    Status {
        /// Only show this grant
        #[arg(long = "for", value_enum)]
        purpose: Option<Purpose>,
    },
}

impl AuthCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<ExitCode> {
        match self {
            AuthCommand::Login { purpose } => self.execute_login(ctx, (*purpose).into()).await,
            AuthCommand::Logout { purpose } => self.execute_logout(ctx, (*purpose).into()).await,
            AuthCommand::Status { purpose } => {
                let purposes = match purpose {
                    Some(p) => vec![(*p).into()],
                    // S3 uploads use AWS credentials, not a stored token
                    None => match ctx.config()?.storage.provider {
                        StorageProvider::Gcs => vec![TokenPurpose::Storage, TokenPurpose::Mail],
                        StorageProvider::S3 => vec![TokenPurpose::Mail],
                    },
                };
                self.execute_status(ctx, &purposes).await
            }
        }
    }

    /// Execute the login flow:
    /// 1. Build the OAuth client settings for the purpose
    /// 2. Open the browser and wait for the loopback redirect
    /// 3. Exchange the code and write the token file
    async fn execute_login(&self, ctx: &CommandContext, purpose: TokenPurpose) -> Result<ExitCode> {
        let fmt = ctx.formatter();
        let config = ctx.config()?;

        let oauth = OAuthConfig::from_settings(&config.auth, purpose)?;
        let storage = token_storage(config, purpose);
        let path = storage.path().to_path_buf();

        info!(%purpose, "Starting OAuth2 login");
        fmt.info(&format!("Opening browser to authorize {purpose} access..."));

        let login = OAuthLogin::new(oauth, storage);
        let token = login
            .login(|url| {
                fmt.info("If the browser does not open, visit:");
                fmt.info(url);
            })
            .await
            .context("OAuth2 login failed")?;

        if ctx.is_json() {
            fmt.print_json(&serde_json::json!({
                "success": true,
                "purpose": purpose.to_string(),
                "token_file": path.display().to_string(),
                "expires_at": token.expires_at,
                "has_refresh_token": token.refresh_token.is_some(),
            }));
        } else {
            fmt.success(&format!("Authorized {purpose} access"));
            fmt.field("token file", &path.display());
            if token.refresh_token.is_none() {
                fmt.warn("No refresh token was issued; runs will stop working when the token expires");
            }
        }

        Ok(ExitCode::SUCCESS)
    }

    async fn execute_logout(&self, ctx: &CommandContext, purpose: TokenPurpose) -> Result<ExitCode> {
        let fmt = ctx.formatter();
        let config = ctx.config()?;
        let storage = token_storage(config, purpose);

        storage.clear().await?;
        fmt.success(&format!(
            "Removed {purpose} token ({})",
            storage.path().display()
        ));
        Ok(ExitCode::SUCCESS)
    }

    async fn execute_status(
        &self,
        ctx: &CommandContext,
        purposes: &[TokenPurpose],
    ) -> Result<ExitCode> {
        let fmt = ctx.formatter();
        let config = ctx.config()?;
        let mut statuses = Vec::new();

        for &purpose in purposes {
            let storage = token_storage(config, purpose);
            let token = storage.load().await?;

            match &token {
                Some(token) => {
                    let state = if !token.needs_refresh() {
                        "valid"
                    } else if token.refresh_token.is_some() {
                        "expired, will be refreshed on next use"
                    } else {
                        "expired; run `labintake auth login` again"
                    };
                    fmt.success(&format!("{purpose}: authorized"));
                    fmt.field("token file", &storage.path().display());
                    fmt.field("expires at", &token.expires_at.to_rfc3339());
                    fmt.field("state", &state);
                }
                None => {
                    fmt.warn(&format!(
                        "{purpose}: not authorized (run `labintake auth login --for {purpose}`)"
                    ));
                }
            }

            statuses.push(serde_json::json!({
                "purpose": purpose.to_string(),
                "token_file": storage.path().display().to_string(),
                "authorized": token.is_some(),
                "expires_at": token.as_ref().map(|t| t.expires_at),
                "needs_refresh": token.as_ref().map(|t| t.needs_refresh()),
                "has_refresh_token": token.as_ref().map(|t| t.refresh_token.is_some()),
            }));
        }

        if ctx.is_json() {
            fmt.print_json(&serde_json::Value::Array(statuses));
        }
        Ok(ExitCode::SUCCESS)
    }
}
