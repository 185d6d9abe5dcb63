//! Object upload against a mocked storage endpoint

use labintake_cloud::storage::HttpObjectStore;
use labintake_core::ports::{IObjectStore, UploadError};
use wiremock::matchers::{body_bytes, header, method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{authorized, staged_sample, start_server, unauthorized};

#[tokio::test]
async fn test_put_object_sends_body_and_headers() {
    let server = start_server().await;
    let (_dir, staged) = staged_sample("sample1.json", br#"{"id": 1}"#);

    Mock::given(method("PUT"))
        .and(path("/lab-valid/sample1.json"))
        .and(header("authorization", "Bearer test-access-token"))
        .and(header("content-type", "application/json"))
        .and(header("x-goog-if-generation-match", "0"))
        .and(body_bytes(br#"{"id": 1}"#.to_vec()))
        .respond_with(ResponseTemplate::new(200).insert_header("x-goog-generation", "1712345"))
        .expect(1)
        .mount(&server)
        .await;

    let store = HttpObjectStore::new(&server.uri(), authorized(), false).unwrap();
    let object = store
        .put_object(&staged, "lab-valid", "sample1.json")
        .await
        .unwrap();

    assert_eq!(object.bucket, "lab-valid");
    assert_eq!(object.key, "sample1.json");
    assert_eq!(object.size, 9);
    assert_eq!(object.generation.as_deref(), Some("1712345"));
}

#[tokio::test]
async fn test_existing_object_is_reported_as_already_exists() {
    let server = start_server().await;
    let (_dir, staged) = staged_sample("sample1.json", b"{}");

    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(412).set_body_string("PreconditionFailed"))
        .mount(&server)
        .await;

    let store = HttpObjectStore::new(&server.uri(), authorized(), false).unwrap();
    let err = store
        .put_object(&staged, "lab-valid", "sample1.json")
        .await
        .unwrap_err();

    assert_eq!(err, UploadError::AlreadyExists);
}

#[tokio::test]
async fn test_overwrite_omits_precondition() {
    let server = start_server().await;
    let (_dir, staged) = staged_sample("sample1.json", b"{}");

    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let store = HttpObjectStore::new(&server.uri(), authorized(), true).unwrap();
    store
        .put_object(&staged, "lab-valid", "sample1.json")
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(!requests[0].headers.contains_key("x-goog-if-generation-match"));
}

#[tokio::test]
async fn test_refused_token_is_missing_credentials() {
    let server = start_server().await;
    let (_dir, staged) = staged_sample("s.json", b"{}");

    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Invalid Credentials"))
        .mount(&server)
        .await;

    let store = HttpObjectStore::new(&server.uri(), authorized(), false).unwrap();
    let err = store.put_object(&staged, "lab-valid", "s.json").await.unwrap_err();
    assert_eq!(err, UploadError::MissingCredentials);
}

#[tokio::test]
async fn test_no_token_sends_nothing() {
    let server = start_server().await;
    let (_dir, staged) = staged_sample("s.json", b"{}");

    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let store = HttpObjectStore::new(&server.uri(), unauthorized(), false).unwrap();
    let err = store.put_object(&staged, "lab-valid", "s.json").await.unwrap_err();
    assert_eq!(err, UploadError::MissingCredentials);
}

#[tokio::test]
async fn test_server_error_is_rejected_with_status() {
    let server = start_server().await;
    let (_dir, staged) = staged_sample("s.json", b"{}");

    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(503).set_body_string("backend unavailable"))
        .mount(&server)
        .await;

    let store = HttpObjectStore::new(&server.uri(), authorized(), false).unwrap();
    let err = store.put_object(&staged, "lab-valid", "s.json").await.unwrap_err();
    match err {
        UploadError::Rejected { status, message } => {
            assert_eq!(status, 503);
            assert!(message.contains("backend unavailable"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_local_file_is_transport_error() {
    let server = start_server().await;
    let dir = tempfile::TempDir::new().unwrap();

    let store = HttpObjectStore::new(&server.uri(), authorized(), false).unwrap();
    let err = store
        .put_object(&dir.path().join("gone.json"), "lab-valid", "gone.json")
        .await
        .unwrap_err();
    assert!(matches!(err, UploadError::Transport(_)));
}
