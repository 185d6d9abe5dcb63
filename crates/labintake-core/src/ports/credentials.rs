//! Credential provider port (driven/secondary port)
//!
//! Supplies a bearer token for the storage and mail adapters. A run never
//! prompts a human: when no usable token exists the provider answers `None`
//! and the caller fails the affected operation.

use std::fmt;

use chrono::{DateTime, Utc};

/// A short-lived OAuth access token
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    secret: String,
    expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    /// Wraps a raw bearer token
    pub fn new(secret: impl Into<String>, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            secret: secret.into(),
            expires_at,
        }
    }

    /// The raw token to place in an `Authorization: Bearer` header
    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// When the token stops being accepted, if known
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }
}

// Keep secrets out of logs
impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("secret", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Port trait for non-interactive token acquisition
#[async_trait::async_trait]
pub trait ICredentialProvider: Send + Sync {
    /// Returns a currently valid access token, refreshing it if needed
    ///
    /// # Returns
    /// * `Ok(Some(token))` - A token that can be used right away
    /// * `Ok(None)` - No persisted token, or it could not be refreshed
    /// * `Err(_)` - The token store itself could not be read
    async fn authorized_token(&self) -> anyhow::Result<Option<AccessToken>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_secret() {
        let token = AccessToken::new("ya29.secret", None);
        let debug = format!("{:?}", token);
        assert!(!debug.contains("ya29"));
        assert!(debug.contains("REDACTED"));
        assert_eq!(token.secret(), "ya29.secret");
    }
}
