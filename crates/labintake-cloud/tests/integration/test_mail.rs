//! Alert delivery against a mocked mail endpoint

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use labintake_cloud::mail::GmailNotifier;
use labintake_core::ports::INotificationGateway;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{authorized, start_server, unauthorized};

const SEND_PATH: &str = "/gmail/v1/users/me/messages/send";

#[tokio::test]
async fn test_send_alert_posts_encoded_message() {
    let server = start_server().await;

    Mock::given(method("POST"))
        .and(path(SEND_PATH))
        .and(header("authorization", "Bearer test-access-token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "msg-001" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let notifier = GmailNotifier::new(&server.uri(), authorized(), None).unwrap();
    notifier
        .send_alert(
            "lab@example.org",
            "Invalid Sample Detected",
            "The file /staging/s.json is invalid due to the following reason: malformed input",
        )
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let payload: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let raw = payload["raw"].as_str().unwrap();
    let message = String::from_utf8(URL_SAFE.decode(raw).unwrap()).unwrap();

    assert!(message.contains("To: lab@example.org\r\n"));
    assert!(message.contains("Subject: Invalid Sample Detected\r\n"));
    assert!(message
        .ends_with("The file /staging/s.json is invalid due to the following reason: malformed input"));
}

#[tokio::test]
async fn test_send_alert_failure_is_error() {
    let server = start_server().await;

    Mock::given(method("POST"))
        .and(path(SEND_PATH))
        .respond_with(ResponseTemplate::new(403).set_body_string("insufficient scope"))
        .mount(&server)
        .await;

    let notifier = GmailNotifier::new(&server.uri(), authorized(), None).unwrap();
    let err = notifier
        .send_alert("lab@example.org", "s", "b")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("insufficient scope"));
}

#[tokio::test]
async fn test_send_alert_without_token_makes_no_request() {
    let server = start_server().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let notifier = GmailNotifier::new(&server.uri(), unauthorized(), None).unwrap();
    assert!(notifier.send_alert("lab@example.org", "s", "b").await.is_err());
}
