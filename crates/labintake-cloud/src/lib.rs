//! LabIntake Cloud - Storage, mail and OAuth2 adapters
//!
//! Provides async adapters for:
//! - Object upload to Amazon S3 (AWS SDK, default credential chain)
//! - Object upload to Google Cloud Storage (XML API)
//! - Rejection alerts through the Gmail REST API
//! - OAuth2 Authorization Code with PKCE, token file persistence and
//!   silent token refresh
//!
//! ## Modules
//!
//! - [`auth`] - OAuth2 PKCE flow, token file storage, credential provider
//! - [`client`] - Authenticated HTTP client shared by the adapters
//! - [`mail`] - `INotificationGateway` adapter
//! - [`s3`] - `IObjectStore` adapter for S3
//! - [`storage`] - `IObjectStore` adapter for Google Cloud Storage

pub mod auth;
pub mod client;
pub mod mail;
pub mod s3;
pub mod storage;

use labintake_core::ports::UploadError;
use reqwest::StatusCode;
use thiserror::Error;

/// Errors that can occur when talking to the cloud services
#[derive(Debug, Error)]
pub enum CloudError {
    /// No persisted token, or it could not be refreshed
    #[error("No usable access token")]
    MissingToken,

    /// The token was refused
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Insufficient permissions for the requested operation
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The requested resource (bucket, endpoint) does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// A write precondition failed (the object already exists)
    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    /// Any other non-success status
    #[error("HTTP {status}: {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body
        message: String,
    },

    /// A network-level error occurred
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// A local file could not be read for upload
    #[error("Local I/O error: {0}")]
    LocalIo(String),

    /// The configured endpoint could not be turned into a request URL
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// The response could not be parsed or was malformed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl CloudError {
    /// Classifies a non-success HTTP status
    pub fn from_status(status: StatusCode, body: String) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => CloudError::Unauthorized(body),
            StatusCode::FORBIDDEN => CloudError::Forbidden(body),
            StatusCode::NOT_FOUND => CloudError::NotFound(body),
            StatusCode::PRECONDITION_FAILED => CloudError::PreconditionFailed(body),
            _ => CloudError::Status {
                status: status.as_u16(),
                message: body,
            },
        }
    }
}

impl From<CloudError> for UploadError {
    fn from(err: CloudError) -> Self {
        match err {
            CloudError::MissingToken | CloudError::Unauthorized(_) => {
                UploadError::MissingCredentials
            }
            CloudError::PreconditionFailed(_) => UploadError::AlreadyExists,
            CloudError::Forbidden(message) => UploadError::Rejected {
                status: 403,
                message,
            },
            CloudError::NotFound(message) => UploadError::Rejected {
                status: 404,
                message,
            },
            CloudError::Status { status, message } => UploadError::Rejected { status, message },
            CloudError::NetworkError(e) => UploadError::Transport(e.to_string()),
            CloudError::LocalIo(message)
            | CloudError::InvalidEndpoint(message)
            | CloudError::InvalidResponse(message) => UploadError::Transport(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            CloudError::from_status(StatusCode::UNAUTHORIZED, String::new()),
            CloudError::Unauthorized(_)
        ));
        assert!(matches!(
            CloudError::from_status(StatusCode::PRECONDITION_FAILED, String::new()),
            CloudError::PreconditionFailed(_)
        ));
        assert!(matches!(
            CloudError::from_status(StatusCode::BAD_GATEWAY, "oops".into()),
            CloudError::Status { status: 502, .. }
        ));
    }

    #[test]
    fn test_upload_error_mapping() {
        assert_eq!(
            UploadError::from(CloudError::MissingToken),
            UploadError::MissingCredentials
        );
        assert_eq!(
            UploadError::from(CloudError::Unauthorized("expired".into())),
            UploadError::MissingCredentials
        );
        assert_eq!(
            UploadError::from(CloudError::PreconditionFailed(String::new())),
            UploadError::AlreadyExists
        );
        assert_eq!(
            UploadError::from(CloudError::Forbidden("no access".into())),
            UploadError::Rejected {
                status: 403,
                message: "no access".into()
            }
        );
        assert!(matches!(
            UploadError::from(CloudError::LocalIo("gone".into())),
            UploadError::Transport(_)
        ));
    }
}
