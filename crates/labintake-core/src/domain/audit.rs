//! Audit entry domain entities
//!
//! Every state transition, error and external-call outcome of an intake run
//! is captured as an [`AuditEntry`]. Entries are append-only; the sink that
//! persists them is a port (`IAuditSink`).

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::errors::DomainError;

/// Identifier of one intake run (one scan-and-process pass)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(Uuid);

impl RunId {
    /// Create a new random RunId
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID value
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RunId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RunId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| DomainError::InvalidId(format!("Invalid UUID: {e}")))
    }
}

/// Actions that can be recorded in the audit log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// An intake pass started
    RunStart,
    /// An intake pass finished its listing
    RunComplete,
    /// A candidate was not confirmed stable and was left in place
    FileSkipped,
    /// A file was moved into staging
    FileStaged,
    /// A staged file was validated
    FileValidated,
    /// A file was uploaded to a sink
    FileUploaded,
    /// A staged copy was removed
    FileCleaned,
    /// A rejection alert was sent
    NotificationSent,
    /// A retained staged file was moved back for reprocessing
    FileRequeued,
    /// An error occurred
    Error,
}

impl Display for AuditAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            AuditAction::RunStart => "run_start",
            AuditAction::RunComplete => "run_complete",
            AuditAction::FileSkipped => "file_skipped",
            AuditAction::FileStaged => "file_staged",
            AuditAction::FileValidated => "file_validated",
            AuditAction::FileUploaded => "file_uploaded",
            AuditAction::FileCleaned => "file_cleaned",
            AuditAction::NotificationSent => "notification_sent",
            AuditAction::FileRequeued => "file_requeued",
            AuditAction::Error => "error",
        };
        write!(f, "{}", s)
    }
}

/// Result of an audited action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditResult {
    /// The action completed successfully
    Success,
    /// The action failed with an error code and message
    Failed {
        /// Error code for categorization
        code: String,
        /// Human-readable error message
        message: String,
    },
}

impl AuditResult {
    /// Creates a successful result
    pub fn success() -> Self {
        AuditResult::Success
    }

    /// Creates a failed result with the given code and message
    pub fn failed(code: impl Into<String>, message: impl Into<String>) -> Self {
        AuditResult::Failed {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Returns true if the result is a success
    pub fn is_success(&self) -> bool {
        matches!(self, AuditResult::Success)
    }

    /// Returns true if the result is a failure
    pub fn is_failed(&self) -> bool {
        matches!(self, AuditResult::Failed { .. })
    }
}

/// An audit log entry recording a significant operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// When the action occurred
    timestamp: DateTime<Utc>,
    /// Run the action belongs to, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    run_id: Option<RunId>,
    /// The type of action that was performed
    action: AuditAction,
    /// The result of the action
    result: AuditResult,
    /// File the action concerns, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    /// Additional structured details about the action
    #[serde(default)]
    details: Value,
    /// How long the action took in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    duration_ms: Option<u64>,
}

impl AuditEntry {
    /// Creates a new audit entry stamped with the current time
    ///
    /// # Example
    ///
    /// ```
    /// use labintake_core::domain::audit::{AuditAction, AuditEntry, AuditResult};
    ///
    /// let entry = AuditEntry::new(AuditAction::RunStart, AuditResult::success());
    /// assert!(entry.result().is_success());
    /// assert!(entry.run_id().is_none());
    /// ```
    pub fn new(action: AuditAction, result: AuditResult) -> Self {
        Self {
            timestamp: Utc::now(),
            run_id: None,
            action,
            result,
            path: None,
            details: Value::Null,
            duration_ms: None,
        }
    }

    /// Returns when the action occurred
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Returns the run ID if present
    pub fn run_id(&self) -> Option<&RunId> {
        self.run_id.as_ref()
    }

    /// Returns the action type
    pub fn action(&self) -> AuditAction {
        self.action
    }

    /// Returns the action result
    pub fn result(&self) -> &AuditResult {
        &self.result
    }

    /// Returns the file path if present
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Returns the additional details
    pub fn details(&self) -> &Value {
        &self.details
    }

    /// Returns the duration in milliseconds if recorded
    pub fn duration_ms(&self) -> Option<u64> {
        self.duration_ms
    }

    /// Sets the run ID for this audit entry
    pub fn with_run_id(mut self, run_id: RunId) -> Self {
        self.run_id = Some(run_id);
        self
    }

    /// Sets the file path for this audit entry
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Sets additional details for this audit entry
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    /// Sets the duration in milliseconds for this audit entry
    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_audit_action_serialization() {
        let json = serde_json::to_string(&AuditAction::NotificationSent).unwrap();
        assert_eq!(json, "\"notification_sent\"");
        assert_eq!(AuditAction::FileUploaded.to_string(), "file_uploaded");
    }

    #[test]
    fn test_audit_result_failed() {
        let result = AuditResult::failed("UPLOAD_ERROR", "connection reset");
        assert!(result.is_failed());
        assert!(!result.is_success());
    }

    #[test]
    fn test_entry_builder() {
        let run_id = RunId::new();
        let entry = AuditEntry::new(AuditAction::FileStaged, AuditResult::success())
            .with_run_id(run_id)
            .with_path("/staging/a.json")
            .with_details(json!({"size_bytes": 12}))
            .with_duration_ms(3);

        assert_eq!(entry.run_id(), Some(&run_id));
        assert_eq!(entry.path(), Some("/staging/a.json"));
        assert_eq!(entry.details()["size_bytes"], 12);
        assert_eq!(entry.duration_ms(), Some(3));
    }

    #[test]
    fn test_entry_json_line_shape() {
        let entry = AuditEntry::new(AuditAction::RunStart, AuditResult::success());
        let line = serde_json::to_string(&entry).unwrap();
        assert!(!line.contains('\n'));
        assert!(line.contains("\"action\":\"run_start\""));
        assert!(!line.contains("run_id"));

        let back: AuditEntry = serde_json::from_str(&line).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn test_run_id_parse() {
        let id = RunId::new();
        let parsed: RunId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert!("not-a-uuid".parse::<RunId>().is_err());
    }
}
