//! Silent token refresh against a mocked token endpoint

use chrono::{Duration, Utc};
use labintake_cloud::auth::{
    OAuthConfig, OAuthCredentialProvider, StoredToken, TokenFileStorage, STORAGE_SCOPE,
};
use labintake_core::ports::ICredentialProvider;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn oauth_config(server: &MockServer) -> OAuthConfig {
    OAuthConfig {
        client_id: "test-client-id".into(),
        client_secret: Some("test-secret".into()),
        auth_url: format!("{}/auth", server.uri()),
        token_url: format!("{}/token", server.uri()),
        redirect_port: 8400,
        scopes: vec![STORAGE_SCOPE.into()],
    }
}

fn expired_token() -> StoredToken {
    StoredToken {
        access_token: "stale".into(),
        refresh_token: Some("refresh-123".into()),
        expires_at: Utc::now() - Duration::minutes(5),
        scopes: vec![STORAGE_SCOPE.into()],
    }
}

#[tokio::test]
async fn test_expired_token_is_refreshed_and_persisted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=refresh-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "fresh",
            "token_type": "Bearer",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let storage = TokenFileStorage::new(dir.path().join("storage-token.json"));
    storage.store(&expired_token()).await.unwrap();

    let provider = OAuthCredentialProvider::new(storage.clone(), Some(oauth_config(&server)));
    let access = provider.authorized_token().await.unwrap().unwrap();
    assert_eq!(access.secret(), "fresh");

    let persisted = storage.load().await.unwrap().unwrap();
    assert_eq!(persisted.access_token, "fresh");
    // Not rotated by the response, so the old refresh token is kept
    assert_eq!(persisted.refresh_token.as_deref(), Some("refresh-123"));
    assert!(!persisted.needs_refresh());
}

#[tokio::test]
async fn test_failed_refresh_yields_no_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "invalid_grant"
        })))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let storage = TokenFileStorage::new(dir.path().join("storage-token.json"));
    storage.store(&expired_token()).await.unwrap();

    let provider = OAuthCredentialProvider::new(storage.clone(), Some(oauth_config(&server)));
    assert!(provider.authorized_token().await.unwrap().is_none());

    // The stale token stays on disk for inspection
    let persisted = storage.load().await.unwrap().unwrap();
    assert_eq!(persisted.access_token, "stale");
}
