//! Object upload against a mocked S3 endpoint

use labintake_cloud::s3::S3ObjectStore;
use labintake_core::ports::{IObjectStore, UploadError};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{s3_config, s3_error, staged_sample, start_server};

fn xml_error(status: u16, code: &str, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(status)
        .insert_header("content-type", "application/xml")
        .set_body_string(s3_error(code, message))
}

#[tokio::test]
async fn test_put_object_uses_bucket_path_and_precondition() {
    let server = start_server().await;
    let (_dir, staged) = staged_sample("sample1.json", br#"{"id": 1}"#);

    Mock::given(method("PUT"))
        .and(path("/a2g11-valid/sample1.json"))
        .and(header("if-none-match", "*"))
        .and(header("content-type", "application/json"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("etag", "\"9a0364b9e99bb480dd25e1f0284c8555\"")
                .insert_header("x-amz-version-id", "v1"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let store = S3ObjectStore::new(s3_config(&server), false);
    let object = store
        .put_object(&staged, "a2g11-valid", "sample1.json")
        .await
        .unwrap();

    assert_eq!(object.bucket, "a2g11-valid");
    assert_eq!(object.key, "sample1.json");
    assert_eq!(object.size, 9);
    assert_eq!(object.generation.as_deref(), Some("v1"));

    let requests = server.received_requests().await.unwrap();
    let authorization = requests[0]
        .headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(authorization.starts_with("AWS4-HMAC-SHA256"), "{authorization}");
    assert!(authorization.contains("il-central-1/s3"), "{authorization}");
}

#[tokio::test]
async fn test_existing_key_is_reported_as_already_exists() {
    let server = start_server().await;
    let (_dir, staged) = staged_sample("sample1.json", b"{}");

    Mock::given(method("PUT"))
        .respond_with(xml_error(
            412,
            "PreconditionFailed",
            "At least one of the pre-conditions you specified did not hold",
        ))
        .mount(&server)
        .await;

    let store = S3ObjectStore::new(s3_config(&server), false);
    let err = store
        .put_object(&staged, "a2g11-valid", "sample1.json")
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

    let store = S3ObjectStore::new(s3_config(&server), true);
    store
        .put_object(&staged, "a2g11-valid", "sample1.json")
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("if-none-match").is_none());
}

#[tokio::test]
async fn test_invalid_access_key_is_missing_credentials() {
    let server = start_server().await;
    let (_dir, staged) = staged_sample("sample2.json", b"{}");

    Mock::given(method("PUT"))
        .respond_with(xml_error(
            403,
            "InvalidAccessKeyId",
            "The AWS Access Key Id you provided does not exist in our records.",
        ))
        .mount(&server)
        .await;

    let store = S3ObjectStore::new(s3_config(&server), false);
    let err = store
        .put_object(&staged, "a2g11-invalid", "sample2.json")
        .await
        .unwrap_err();

    assert_eq!(err, UploadError::MissingCredentials);
}

#[tokio::test]
async fn test_access_denied_is_rejected_with_status() {
    let server = start_server().await;
    let (_dir, staged) = staged_sample("sample2.json", b"{}");

    Mock::given(method("PUT"))
        .respond_with(xml_error(403, "AccessDenied", "Access Denied"))
        .mount(&server)
        .await;

    let store = S3ObjectStore::new(s3_config(&server), false);
    let err = store
        .put_object(&staged, "a2g11-invalid", "sample2.json")
        .await
        .unwrap_err();

    assert_eq!(
        err,
        UploadError::Rejected {
            status: 403,
            message: "Access Denied".into()
        }
    );
}

#[tokio::test]
async fn test_server_error_is_attempted_once() {
    let server = start_server().await;
    let (_dir, staged) = staged_sample("sample1.json", b"{}");

    Mock::given(method("PUT"))
        .respond_with(xml_error(503, "SlowDown", "Please reduce your request rate."))
        .mount(&server)
        .await;

    let store = S3ObjectStore::new(s3_config(&server), false);
    let err = store
        .put_object(&staged, "a2g11-valid", "sample1.json")
        .await
        .unwrap_err();

    assert!(matches!(err, UploadError::Rejected { status: 503, .. }));
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_missing_local_file_sends_nothing() {
    let server = start_server().await;
    let (dir, _) = staged_sample("other.json", b"{}");

    let store = S3ObjectStore::new(s3_config(&server), false);
    let err = store
        .put_object(&dir.path().join("gone.json"), "a2g11-valid", "gone.json")
        .await
        .unwrap_err();

    assert!(matches!(err, UploadError::Transport(_)));
    assert!(server.received_requests().await.unwrap().is_empty());
}
