//! Object storage adapter (Google Cloud Storage XML API)
//!
//! Selected with `storage.provider: gcs`; uploads need a token from
//! `labintake auth login --for storage`.
//!
//! Each upload is a single `PUT {endpoint}/{bucket}/{key}` with the whole
//! file as the body. Sample files are small, so there is no resumable
//! session. Unless overwriting is enabled, the request carries
//! `x-goog-if-generation-match: 0`, which makes the service refuse to
//! replace an existing object (HTTP 412).

use std::path::Path;
use std::sync::Arc;

use labintake_core::ports::credentials::ICredentialProvider;
use labintake_core::ports::object_store::{IObjectStore, StoredObject, UploadError};
use reqwest::Method;
use tracing::{debug, info, instrument};

use crate::client::CloudClient;
use crate::CloudError;

/// Precondition header understood by the XML API
const IF_GENERATION_MATCH: &str = "x-goog-if-generation-match";

/// Response header carrying the generation of the written object
const GENERATION_HEADER: &str = "x-goog-generation";

/// Default storage endpoint
pub const DEFAULT_STORAGE_ENDPOINT: &str = "https://storage.googleapis.com";

/// Uploads sample files to storage buckets
pub struct HttpObjectStore {
    client: CloudClient,
    overwrite: bool,
}

impl HttpObjectStore {
    /// Creates a store for the service at `endpoint`
    ///
    /// # Arguments
    /// * `endpoint` - Storage API base URL
    /// * `credentials` - Source of storage-scoped bearer tokens
    /// * `overwrite` - Replace existing objects instead of failing
    pub fn new(
        endpoint: &str,
        credentials: Arc<dyn ICredentialProvider>,
        overwrite: bool,
    ) -> Result<Self, CloudError> {
        Ok(Self {
            client: CloudClient::with_base_url(endpoint, credentials)?,
            overwrite,
        })
    }

    /// Whether existing objects are replaced
    pub fn overwrites(&self) -> bool {
        self.overwrite
    }

    async fn put(&self, local_path: &Path, bucket: &str, key: &str) -> Result<StoredObject, CloudError> {
        let body = tokio::fs::read(local_path)
            .await
            .map_err(|e| CloudError::LocalIo(format!("{}: {e}", local_path.display())))?;
        let size = body.len() as u64;

        let url = self.client.url(&[bucket, key])?;
        let mut request = self
            .client
            .authorized(Method::PUT, url)
            .await?
            .header(reqwest::header::CONTENT_TYPE, content_type_for(key));
        if !self.overwrite {
            request = request.header(IF_GENERATION_MATCH, "0");
        }

        debug!(size, overwrite = self.overwrite, "Uploading object");
        let response = CloudClient::check(request.body(body).send().await?).await?;

        let generation = response
            .headers()
            .get(GENERATION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        Ok(StoredObject {
            bucket: bucket.to_string(),
            key: key.to_string(),
            size,
            generation,
        })
    }
}

/// Content type recorded on the object
pub(crate) fn content_type_for(key: &str) -> &'static str {
    if key.to_ascii_lowercase().ends_with(".json") {
        "application/json"
    } else {
        "application/octet-stream"
    }
}

#[async_trait::async_trait]
impl IObjectStore for HttpObjectStore {
    #[instrument(skip(self), fields(path = %local_path.display()))]
    async fn put_object(
        &self,
        local_path: &Path,
        bucket: &str,
        key: &str,
    ) -> Result<StoredObject, UploadError> {
        let object = self.put(local_path, bucket, key).await?;
        info!(
            bucket = %object.bucket,
            key = %object.key,
            size = object.size,
            generation = object.generation.as_deref().unwrap_or("-"),
            "Object stored"
        );
        Ok(object)
    }
}
