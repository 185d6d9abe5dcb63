//! Object storage adapter (Amazon S3)
//!
//! The default sink (`storage.provider: s3`). Credentials come from the
//! standard AWS chain: environment variables, the shared `~/.aws` profile,
//! SSO, or a container or instance role. LabIntake stores none of them.
//!
//! Each upload is a single `PutObject` with SDK retries switched off. Unless
//! overwriting is enabled, the request carries `If-None-Match: *`, which makes
//! S3 refuse to replace an existing key (HTTP 412).

use std::path::Path;

use aws_sdk_s3::config::retry::RetryConfig;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::operation::put_object::PutObjectError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use labintake_core::ports::object_store::{IObjectStore, StoredObject, UploadError};
use tracing::{debug, info, instrument};

use crate::storage::content_type_for;

/// S3 error codes meaning the signing credentials are unusable
const CREDENTIAL_ERROR_CODES: &[&str] = &[
    "InvalidAccessKeyId",
    "SignatureDoesNotMatch",
    "ExpiredToken",
    "InvalidToken",
    "TokenRefreshRequired",
];

/// Uploads sample files to S3 buckets
pub struct S3ObjectStore {
    client: Client,
    overwrite: bool,
}

impl S3ObjectStore {
    /// Creates a store from an SDK configuration
    ///
    /// Retries configured on `config` are replaced: every call is exactly
    /// one attempt.
    pub fn new(config: aws_sdk_s3::Config, overwrite: bool) -> Self {
        let config = config
            .to_builder()
            .retry_config(RetryConfig::disabled())
            .build();
        Self {
            client: Client::from_conf(config),
            overwrite,
        }
    }

    /// Creates a store that resolves credentials like the AWS CLI does
    ///
    /// # Arguments
    /// * `region` - Bucket region; `None` defers to `AWS_REGION` or the profile
    /// * `endpoint` - Endpoint override for S3-compatible services
    /// * `overwrite` - Replace existing objects instead of failing
    pub async fn from_environment(
        region: Option<&str>,
        endpoint: Option<&str>,
        overwrite: bool,
    ) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(Region::new(region.to_string()));
        }
        let shared = loader.load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(endpoint) = endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        let store = Self::new(builder.build(), overwrite);
        debug!(
            region = store.region().unwrap_or("-"),
            endpoint = endpoint.unwrap_or("-"),
            "S3 client configured"
        );
        store
    }

    /// Region requests are signed for
    pub fn region(&self) -> Option<&str> {
        self.client.config().region().map(|r| r.as_ref())
    }

    /// Whether existing objects are replaced
    pub fn overwrites(&self) -> bool {
        self.overwrite
    }

    async fn put(
        &self,
        local_path: &Path,
        bucket: &str,
        key: &str,
    ) -> Result<StoredObject, UploadError> {
        let body = tokio::fs::read(local_path)
            .await
            .map_err(|e| UploadError::Transport(format!("{}: {e}", local_path.display())))?;
        let size = body.len() as u64;

        let mut request = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type_for(key))
            .body(ByteStream::from(body));
        if !self.overwrite {
            request = request.if_none_match("*");
        }

        debug!(size, overwrite = self.overwrite, "Uploading object");
        let output = request.send().await.map_err(classify)?;

        Ok(StoredObject {
            bucket: bucket.to_string(),
            key: key.to_string(),
            size,
            generation: output.version_id().map(str::to_string),
        })
    }
}

/// Maps an SDK failure onto the port's failure kinds
fn classify(err: SdkError<PutObjectError>) -> UploadError {
    if let SdkError::ServiceError(service) = &err {
        let status = service.raw().status().as_u16();
        let code = service.err().code();
        if status == 412 {
            return UploadError::AlreadyExists;
        }
        if code.is_some_and(|c| CREDENTIAL_ERROR_CODES.contains(&c)) {
            return UploadError::MissingCredentials;
        }
        return UploadError::Rejected {
            status,
            message: service
                .err()
                .message()
                .or(code)
                .unwrap_or("no error message")
                .to_string(),
        };
    }

    // Credential resolution fails before anything is sent
    let message = DisplayErrorContext(&err).to_string();
    let lower = message.to_ascii_lowercase();
    if lower.contains("credential") || lower.contains("identity") {
        UploadError::MissingCredentials
    } else {
        UploadError::Transport(message)
    }
}

#[async_trait::async_trait]
impl IObjectStore for S3ObjectStore {
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
            version = object.generation.as_deref().unwrap_or("-"),
            "Object stored"
        );
        Ok(object)
    }
}

#[cfg(test)]
mod tests {
    use aws_sdk_s3::config::{BehaviorVersion, Credentials};

    use super::*;

    fn config() -> aws_sdk_s3::Config {
        aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("il-central-1"))
            .credentials_provider(Credentials::new("AKID", "secret", None, None, "test"))
            .build()
    }

    #[test]
    fn test_store_keeps_region_and_disables_retries() {
        let store = S3ObjectStore::new(config(), false);
        assert_eq!(store.region(), Some("il-central-1"));
        assert!(!store.overwrites());

        let retry = store.client.config().retry_config().cloned();
        assert_eq!(retry.map(|r| r.max_attempts()), Some(1));
    }
}
