//! Configuration module for LabIntake.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::Buckets;
use crate::ports::notification::DEFAULT_ALERT_SUBJECT;

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for LabIntake.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub intake: IntakeConfig,
    pub storage: StorageConfig,
    pub notify: NotifyConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
}

/// Which write-completion check to run on candidates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StabilityMode {
    /// Compare file sizes across the quiescence window.
    #[default]
    Size,
    /// Compare SHA-256 digests across the quiescence window.
    Checksum,
}

/// Which object storage service receives uploads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageProvider {
    /// Amazon S3 with the default AWS credential chain.
    #[default]
    S3,
    /// Google Cloud Storage XML API with an OAuth token from `labintake auth login`.
    Gcs,
}

/// Watched/staging directory settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IntakeConfig {
    /// Directory producers drop sample files into.
    pub watched_dir: PathBuf,
    /// Directory files are moved into before processing. Created if absent.
    pub staging_dir: PathBuf,
    /// Seconds a file must stay unchanged before it is considered complete.
    pub quiescence_secs: u64,
    /// Stability strategy: `size` or `checksum`.
    pub stability: StabilityMode,
}

/// Object storage sink settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Storage service: `s3` or `gcs`.
    pub provider: StorageProvider,
    /// AWS region of the buckets. `None` defers to the AWS environment and
    /// profile. Ignored for `gcs`.
    pub region: Option<String>,
    /// Endpoint override. `None` uses the provider's public endpoint; set it
    /// for S3-compatible services.
    pub endpoint: Option<String>,
    /// Bucket receiving valid samples.
    pub accepted_bucket: String,
    /// Bucket receiving rejected samples.
    pub rejected_bucket: String,
    /// Replace an existing object with the same key instead of failing.
    pub overwrite: bool,
    /// Persisted OAuth token used for `gcs` uploads.
    pub token_file: PathBuf,
}

/// Rejection alert settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Send an alert for every rejected sample.
    pub enabled: bool,
    /// `From` address. `None` lets the mail service fill in the account address.
    pub sender: Option<String>,
    /// Who receives rejection alerts.
    pub recipient: String,
    /// Subject line of the alert.
    pub subject: String,
    /// Base URL of the mail REST API.
    pub api_base: String,
    /// Persisted OAuth token used for sending mail.
    pub token_file: PathBuf,
}

/// OAuth client settings shared by the mail and storage logins.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// OAuth client ID. `None` until the user configures one.
    pub client_id: Option<String>,
    /// OAuth client secret, for clients registered as "desktop app".
    pub client_secret: Option<String>,
    /// Authorization endpoint.
    pub auth_url: String,
    /// Token endpoint.
    pub token_url: String,
    /// Loopback port for the consent redirect.
    pub redirect_port: u16,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Append-only log file.
    pub file: PathBuf,
    /// Append-only JSON-lines audit trail.
    pub audit_file: PathBuf,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/labintake/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("labintake")
            .join("config.yaml")
    }

    /// Serialize to YAML, as written by `labintake config init`.
    pub fn to_yaml(&self) -> anyhow::Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// The bucket binding for routing.
    pub fn buckets(&self) -> Buckets {
        Buckets::new(
            self.storage.accepted_bucket.clone(),
            self.storage.rejected_bucket.clone(),
        )
    }
}

impl IntakeConfig {
    /// Quiescence window as a [`Duration`].
    pub fn quiescence(&self) -> Duration {
        Duration::from_secs(self.quiescence_secs)
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("~/.local/share"))
        .join("labintake")
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            watched_dir: dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("LabIntake")
                .join("incoming"),
            staging_dir: data_dir().join("staging"),
            quiescence_secs: 5,
            stability: StabilityMode::Size,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            provider: StorageProvider::S3,
            region: None,
            endpoint: None,
            accepted_bucket: String::new(),
            rejected_bucket: String::new(),
            overwrite: false,
            token_file: data_dir().join("storage-token.json"),
        }
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sender: None,
            recipient: String::new(),
            subject: DEFAULT_ALERT_SUBJECT.to_string(),
            api_base: "https://gmail.googleapis.com".to_string(),
            token_file: data_dir().join("mail-token.json"),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            redirect_port: 8400,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        let data_dir = data_dir();
        Self {
            level: "info".to_string(),
            file: data_dir.join("labintake.log"),
            audit_file: data_dir.join("audit.jsonl"),
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single problem found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    /// Dotted path to the offending field, e.g. `"intake.quiescence_secs"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl ConfigIssue {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Validate the configuration and return all issues found.
    ///
    /// An empty vector means the configuration is usable for a run.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        // --- intake ---
        if self.intake.quiescence_secs == 0 {
            issues.push(ConfigIssue::new(
                "intake.quiescence_secs",
                "must be greater than 0",
            ));
        }
        if self.intake.watched_dir.as_os_str().is_empty() {
            issues.push(ConfigIssue::new("intake.watched_dir", "must be set"));
        }
        if self.intake.staging_dir.as_os_str().is_empty() {
            issues.push(ConfigIssue::new("intake.staging_dir", "must be set"));
        }
        if self.intake.watched_dir == self.intake.staging_dir {
            issues.push(ConfigIssue::new(
                "intake.staging_dir",
                "must differ from intake.watched_dir",
            ));
        }

        // --- storage ---
        if self.storage.accepted_bucket.trim().is_empty() {
            issues.push(ConfigIssue::new("storage.accepted_bucket", "must be set"));
        }
        if self.storage.rejected_bucket.trim().is_empty() {
            issues.push(ConfigIssue::new("storage.rejected_bucket", "must be set"));
        }
        if !self.storage.accepted_bucket.is_empty()
            && self.storage.accepted_bucket == self.storage.rejected_bucket
        {
            issues.push(ConfigIssue::new(
                "storage.rejected_bucket",
                "must differ from storage.accepted_bucket",
            ));
        }
        if let Some(endpoint) = &self.storage.endpoint {
            if url::Url::parse(endpoint).is_err() {
                issues.push(ConfigIssue::new(
                    "storage.endpoint",
                    format!("not a valid URL: {endpoint}"),
                ));
            }
        }
        if self
            .storage
            .region
            .as_deref()
            .is_some_and(|r| r.trim().is_empty())
        {
            issues.push(ConfigIssue::new(
                "storage.region",
                "must not be empty when set",
            ));
        }

        // --- notify ---
        if self.notify.enabled {
            if !self.notify.recipient.contains('@') {
                issues.push(ConfigIssue::new(
                    "notify.recipient",
                    "must be an email address when notifications are enabled",
                ));
            }
            if self.notify.subject.trim().is_empty() {
                issues.push(ConfigIssue::new("notify.subject", "must not be empty"));
            }
            if url::Url::parse(&self.notify.api_base).is_err() {
                issues.push(ConfigIssue::new(
                    "notify.api_base",
                    format!("not a valid URL: {}", self.notify.api_base),
                ));
            }
        }

        // --- auth ---
        if self.auth.redirect_port == 0 {
            issues.push(ConfigIssue::new(
                "auth.redirect_port",
                "must be greater than 0",
            ));
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            issues.push(ConfigIssue::new(
                "logging.level",
                format!(
                    "invalid level '{}', expected one of: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            ));
        }

        issues
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for [`Config`], starting from the defaults.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a builder pre-populated with [`Config::default`].
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- intake ---

    pub fn watched_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.intake.watched_dir = dir.into();
        self
    }

    pub fn staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.intake.staging_dir = dir.into();
        self
    }

    pub fn quiescence_secs(mut self, seconds: u64) -> Self {
        self.config.intake.quiescence_secs = seconds;
        self
    }

    pub fn stability(mut self, mode: StabilityMode) -> Self {
        self.config.intake.stability = mode;
        self
    }

    // --- storage ---

    pub fn storage_provider(mut self, provider: StorageProvider) -> Self {
        self.config.storage.provider = provider;
        self
    }

    pub fn storage_region(mut self, region: impl Into<String>) -> Self {
        self.config.storage.region = Some(region.into());
        self
    }

    pub fn storage_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.storage.endpoint = Some(endpoint.into());
        self
    }

    pub fn buckets(mut self, accepted: impl Into<String>, rejected: impl Into<String>) -> Self {
        self.config.storage.accepted_bucket = accepted.into();
        self.config.storage.rejected_bucket = rejected.into();
        self
    }

    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.config.storage.overwrite = overwrite;
        self
    }

    // --- notify ---

    pub fn notify_enabled(mut self, enabled: bool) -> Self {
        self.config.notify.enabled = enabled;
        self
    }

    pub fn notify_recipient(mut self, recipient: impl Into<String>) -> Self {
        self.config.notify.recipient = recipient.into();
        self
    }

    pub fn notify_sender(mut self, sender: impl Into<String>) -> Self {
        self.config.notify.sender = Some(sender.into());
        self
    }

    // --- auth ---

    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.config.auth.client_id = Some(client_id.into());
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn logging_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.config.logging.file = file.into();
        self
    }

    pub fn audit_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.config.logging.audit_file = file.into();
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// issues if the configuration is not usable.
    pub fn build_validated(self) -> Result<Config, Vec<ConfigIssue>> {
        let config = self.build();
        let issues = config.validate();
        if issues.is_empty() {
            Ok(config)
        } else {
            Err(issues)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
