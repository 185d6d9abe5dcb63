//! Rejection alerts over the Gmail REST API
//!
//! Builds a plain-text RFC 822 message, encodes it base64url, and posts it
//! to `users/me/messages/send`. The sending account is whichever account
//! granted the mail token.

use std::sync::Arc;

use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine;
use labintake_core::ports::credentials::ICredentialProvider;
use labintake_core::ports::notification::INotificationGateway;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::client::CloudClient;
use crate::CloudError;

/// Default mail API endpoint
pub const DEFAULT_MAIL_API_BASE: &str = "https://gmail.googleapis.com";

#[derive(Debug, Serialize)]
struct SendRequest {
    raw: String,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    id: Option<String>,
}

/// Sends alerts as mail from the authorized account
pub struct GmailNotifier {
    client: CloudClient,
    sender: Option<String>,
}

impl GmailNotifier {
    /// Creates a notifier for the mail API at `api_base`
    ///
    /// # Arguments
    /// * `api_base` - Mail API base URL
    /// * `credentials` - Source of mail-scoped bearer tokens
    /// * `sender` - `From` header; `None` lets the service use the account address
    pub fn new(
        api_base: &str,
        credentials: Arc<dyn ICredentialProvider>,
        sender: Option<String>,
    ) -> Result<Self, CloudError> {
        Ok(Self {
            client: CloudClient::with_base_url(api_base, credentials)?,
            sender,
        })
    }

    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<Option<String>, CloudError> {
        let message = build_message(self.sender.as_deref(), recipient, subject, body);
        let payload = SendRequest {
            raw: URL_SAFE.encode(message.as_bytes()),
        };

        let url = self
            .client
            .url(&["gmail", "v1", "users", "me", "messages", "send"])?;
        let response = self
            .client
            .authorized(Method::POST, url)
            .await?
            .json(&payload)
            .send()
            .await?;
        let response = CloudClient::check(response).await?;

        let sent: SendResponse = response
            .json()
            .await
            .map_err(|e| CloudError::InvalidResponse(e.to_string()))?;
        Ok(sent.id)
    }
}

#[async_trait::async_trait]
impl INotificationGateway for GmailNotifier {
    #[instrument(skip(self, body))]
    async fn send_alert(&self, recipient: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        let id = self.send(recipient, subject, body).await?;
        info!(message_id = id.as_deref().unwrap_or("-"), "Mail sent");
        Ok(())
    }
}

/// Strips line breaks so a value cannot start a new header
fn header_value(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}

/// RFC 2047 encoded-word for non-ASCII header text
fn encode_header_text(value: &str) -> String {
    let value = header_value(value);
    if value.is_ascii() {
        value
    } else {
        format!("=?utf-8?B?{}?=", STANDARD.encode(value.as_bytes()))
    }
}

/// Builds a single-part plain-text message
pub(crate) fn build_message(sender: Option<&str>, to: &str, subject: &str, body: &str) -> String {
    let mut message = String::new();
    message.push_str("MIME-Version: 1.0\r\n");
    message.push_str("Content-Type: text/plain; charset=\"utf-8\"\r\n");
    message.push_str("Content-Transfer-Encoding: 8bit\r\n");
    message.push_str(&format!("To: {}\r\n", header_value(to)));
    if let Some(sender) = sender {
        message.push_str(&format!("From: {}\r\n", header_value(sender)));
    }
    message.push_str(&format!("Subject: {}\r\n", encode_header_text(subject)));
    message.push_str("\r\n");
    message.push_str(&body.replace("\r\n", "\n").replace('\n', "\r\n"));
    message
}
