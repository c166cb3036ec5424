//! Integration tests for the image relay client against a mocked upstream
//!
//! Run with: cargo test -p classroom-core --test image_relay

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use classroom_core::models::{ImageEditRequest, ImageModel, UploadedFile};
use classroom_core::service::{ApiConfig, ApiConfigStore, ImageRelayClient, ImageRelayError};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn write_upload(dir: &Path, name: &str) -> UploadedFile {
    let path = dir.join(name);
    std::fs::write(&path, b"\x89PNG\r\n\x1a\nfake").unwrap();
    UploadedFile {
        field: "image".to_string(),
        path,
        original_name: name.to_string(),
        content_type: "image/png".to_string(),
        size: 12,
    }
}

fn edit_request(dir: &Path) -> ImageEditRequest {
    ImageEditRequest {
        image: write_upload(dir, "cat.png"),
        prompt: "Give the cat a wizard hat".to_string(),
        model: ImageModel::GptImage1,
        mask: None,
        n: Some(1),
        quality: Some("high".to_string()),
        size: Some("1024x1024".to_string()),
    }
}

fn client_for(base_url: &str, timeout: Duration) -> ImageRelayClient {
    let store = Arc::new(ApiConfigStore::new(ApiConfig::new(base_url, "sk-test")));
    ImageRelayClient::new(store, timeout).unwrap()
}

#[tokio::test]
async fn test_success_body_is_returned_verbatim() {
    let server = MockServer::start().await;
    let upstream = json!({
        "created": 1_713_833_628,
        "data": [{ "b64_json": "aGVsbG8=" }],
        "usage": { "total_tokens": 100, "input_tokens": 50, "output_tokens": 50 },
        "extra": "kept"
    });

    Mock::given(method("POST"))
        .and(path("/v1/images/edits"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(upstream.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    // trailing slash on the configured base is stripped
    let client = client_for(&format!("{}/", server.uri()), Duration::from_secs(5));

    let result = client.edit_image(&edit_request(dir.path())).await.unwrap();
    assert_eq!(result, upstream);
}

#[tokio::test]
async fn test_multipart_body_carries_fields() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/images/edits"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut request = edit_request(dir.path());
    request.mask = Some(write_upload(dir.path(), "mask.png"));

    client_for(&server.uri(), Duration::from_secs(5))
        .edit_image(&request)
        .await
        .unwrap();

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);

    let content_type = received[0]
        .headers
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(content_type.starts_with("multipart/form-data"));

    let body = String::from_utf8_lossy(&received[0].body);
    assert!(body.contains("name=\"image\"; filename=\"cat.png\""));
    assert!(body.contains("name=\"mask\"; filename=\"mask.png\""));
    assert!(body.contains("Give the cat a wizard hat"));
    assert!(body.contains("gpt-image-1"));
    assert!(body.contains("name=\"quality\""));
    assert!(body.contains("1024x1024"));
    assert!(!body.contains("response_format"));
}

#[tokio::test]
async fn test_upstream_error_carries_status_and_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/images/edits"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": { "message": "Invalid image file", "type": "invalid_request_error" }
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let err = client_for(&server.uri(), Duration::from_secs(5))
        .edit_image(&edit_request(dir.path()))
        .await
        .unwrap_err();

    match &err {
        ImageRelayError::Upstream { status, message } => {
            assert_eq!(*status, 400);
            assert_eq!(message, "Invalid image file");
        }
        other => panic!("expected upstream error, got {other:?}"),
    }
    assert_eq!(err.to_string(), "API error (400): Invalid image file");
}

#[tokio::test]
async fn test_slow_upstream_is_a_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/images/edits"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "data": [] }))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let err = client_for(&server.uri(), Duration::from_millis(200))
        .edit_image(&edit_request(dir.path()))
        .await
        .unwrap_err();

    assert!(matches!(err, ImageRelayError::Timeout), "got {err:?}");
    assert!(err.to_string().contains("timed out"));
}

#[tokio::test]
async fn test_refused_connection_is_a_network_error() {
    // grab a free port, then release it so nothing is listening
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let dir = tempfile::tempdir().unwrap();
    let err = client_for(&format!("http://127.0.0.1:{port}"), Duration::from_secs(5))
        .edit_image(&edit_request(dir.path()))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "network", "got {err:?}");
}

#[tokio::test]
async fn test_missing_configuration_fails_fast() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let store = Arc::new(ApiConfigStore::new(ApiConfig::new(server.uri(), "")));
    let client = ImageRelayClient::new(store.clone(), Duration::from_secs(5)).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let err = client.edit_image(&edit_request(dir.path())).await.unwrap_err();
    assert!(matches!(err, ImageRelayError::Configuration));

    // a runtime update is picked up by the same client
    store.update(ApiConfig::new("", "sk-test"));
    let err = client.edit_image(&edit_request(dir.path())).await.unwrap_err();
    assert!(matches!(err, ImageRelayError::Configuration));
}

#[tokio::test]
async fn test_non_json_success_body_is_unknown() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let err = client_for(&server.uri(), Duration::from_secs(5))
        .edit_image(&edit_request(dir.path()))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "unknown");
    assert!(err.to_string().starts_with("Network error: "), "{err}");
}

#[tokio::test]
async fn test_unreadable_upload_is_unknown_without_calling_upstream() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut request = edit_request(dir.path());
    std::fs::remove_file(&request.image.path).unwrap();
    request.image.original_name = "gone.png".to_string();

    let err = client_for(&server.uri(), Duration::from_secs(5))
        .edit_image(&request)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "unknown");
    assert!(
        err.to_string()
            .starts_with("Network error: Failed to read uploaded file gone.png"),
        "{err}"
    );
}
