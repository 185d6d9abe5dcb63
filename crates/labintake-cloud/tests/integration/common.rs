//! Shared test helpers for the cloud adapter integration tests

use std::path::PathBuf;
use std::sync::Arc;

use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use labintake_core::ports::credentials::{AccessToken, ICredentialProvider};
use tempfile::TempDir;
use wiremock::MockServer;

/// Bearer token handed out by [`StaticCredentials`]
pub const TEST_TOKEN: &str = "test-access-token";

/// Credential provider with a fixed answer
pub struct StaticCredentials(pub Option<&'static str>);

#[async_trait::async_trait]
impl ICredentialProvider for StaticCredentials {
    async fn authorized_token(&self) -> anyhow::Result<Option<AccessToken>> {
        Ok(self.0.map(|secret| AccessToken::new(secret, None)))
    }
}

/// Provider that always has a valid token
pub fn authorized() -> Arc<dyn ICredentialProvider> {
    Arc::new(StaticCredentials(Some(TEST_TOKEN)))
}

/// Provider without any token
pub fn unauthorized() -> Arc<dyn ICredentialProvider> {
    Arc::new(StaticCredentials(None))
}

/// Starts a mock server
pub async fn start_server() -> MockServer {
    MockServer::start().await
}

/// S3 client settings pointing at the mock server with static keys
pub fn s3_config(server: &MockServer) -> aws_sdk_s3::Config {
    aws_sdk_s3::Config::builder()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new("il-central-1"))
        .credentials_provider(Credentials::new(
            "AKIDLABINTAKE",
            "test-secret",
            None,
            None,
            "static",
        ))
        .endpoint_url(server.uri())
        .force_path_style(true)
        .build()
}

/// An S3 error document as the service returns it
pub fn s3_error(code: &str, message: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Error><Code>{code}</Code><Message>{message}</Message><RequestId>REQ1</RequestId></Error>"
    )
}

/// Writes a staged sample into a fresh temp dir
pub fn staged_sample(name: &str, contents: &[u8]) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    (dir, path)
}
