//! Notification gateway port (driven/secondary port)
//!
//! Sends a rejection alert to a human operator. Delivery failures are
//! reported to the caller but never change how a file was routed.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because delivery errors are adapter-specific.
//! - Fire-and-forget: one attempt, no retry.

use serde::{Deserialize, Serialize};

/// Default subject line of a rejection alert
pub const DEFAULT_ALERT_SUBJECT: &str = "Invalid Sample Detected";

/// A rejection alert addressed to one recipient
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    /// Recipient address
    pub recipient: String,
    /// Subject line
    pub subject: String,
    /// Plain-text body
    pub body: String,
}

impl Alert {
    /// Builds the alert for a rejected sample
    ///
    /// # Arguments
    /// * `recipient` - Who receives the alert
    /// * `subject` - Subject line
    /// * `file_path` - Path of the staged copy that was rejected
    /// * `reason` - The validation failure reason
    pub fn invalid_sample(
        recipient: impl Into<String>,
        subject: impl Into<String>,
        file_path: &str,
        reason: &str,
    ) -> Self {
        Self {
            recipient: recipient.into(),
            subject: subject.into(),
            body: format!(
                "The file {} is invalid due to the following reason: {}",
                file_path, reason
            ),
        }
    }
}

/// Port trait for alert delivery
#[async_trait::async_trait]
pub trait INotificationGateway: Send + Sync {
    /// Sends a plain-text alert
    ///
    /// # Arguments
    /// * `recipient` - Recipient address
    /// * `subject` - Subject line
    /// * `body` - Message body
    async fn send_alert(&self, recipient: &str, subject: &str, body: &str) -> anyhow::Result<()>;
}
