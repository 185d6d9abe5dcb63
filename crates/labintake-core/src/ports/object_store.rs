//! Object storage port (driven/secondary port)
//!
//! Uploads a local file to a named bucket under a given key. Unlike the other
//! ports this one returns a typed error: the orchestrator needs to tell a
//! missing credential apart from an already-existing object or a network
//! failure when it reports what must be recovered by hand.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classified failure of a single upload attempt
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UploadError {
    /// No usable access token is available
    #[error("no usable storage credentials")]
    MissingCredentials,

    /// An object with the same key already exists and overwrite is disabled
    #[error("object already exists")]
    AlreadyExists,

    /// The service answered with a non-success status
    #[error("rejected by storage service with status {status}: {message}")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Response body or reason phrase
        message: String,
    },

    /// The request never completed (DNS, TLS, timeout, local read error)
    #[error("transport error: {0}")]
    Transport(String),
}

/// Metadata of an object confirmed written by the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredObject {
    /// Bucket the object was written to
    pub bucket: String,
    /// Object key
    pub key: String,
    /// Number of bytes uploaded
    pub size: u64,
    /// Generation reported by the service, when it reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation: Option<String>,
}

/// Port trait for the object storage sink
///
/// ## Implementation Notes
///
/// - Exactly one write attempt per call; no retries.
/// - A returned `Ok` means the object is durably stored, so the caller may
///   delete its local copy.
#[async_trait::async_trait]
pub trait IObjectStore: Send + Sync {
    /// Uploads `local_path` to `bucket` under `key`
    ///
    /// # Arguments
    /// * `local_path` - File to upload
    /// * `bucket` - Destination bucket name
    /// * `key` - Object key inside the bucket
    ///
    /// # Returns
    /// The stored object's metadata, or a classified [`UploadError`]
    async fn put_object(
        &self,
        local_path: &Path,
        bucket: &str,
        key: &str,
    ) -> Result<StoredObject, UploadError>;
}
