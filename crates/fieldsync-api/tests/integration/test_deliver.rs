//! Integration tests for queued-operation delivery
//!
//! Verifies that RemoteClient::deliver() sends the stored method and
//! payload to the tenant-scoped endpoint and classifies every failure
//! into the business / connectivity / status taxonomy.

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fieldsync_api::RemoteClient;
use fieldsync_core::config::Config;
use fieldsync_core::domain::errors::RemoteError;
use fieldsync_core::domain::queue::{HttpAction, QueuedOperation};

use crate::common;

#[tokio::test]
async fn test_deliver_posts_payload_and_returns_body() {
    let (server, client) = common::setup().await;

    let mapping_body = json!({
        "local_os_id": "LOCAL-A",
        "remote_os_id": "9001",
        "pecas_ids": [{"local_id": "LOCAL-P1", "remote_id": "501"}]
    });

    Mock::given(method("POST"))
        .and(path("/api/demo/Os/ordens/"))
        .and(body_json(common::sample_payload()))
        .respond_with(ResponseTemplate::new(201).set_body_json(mapping_body.clone()))
        .mount(&server)
        .await;

    let entry = common::order_entry(common::sample_payload());
    let body = client.deliver(&entry).await.expect("deliver failed");

    assert_eq!(body, mapping_body);
}

#[tokio::test]
async fn test_deliver_sends_bearer_token() {
    let server = MockServer::start().await;
    let mut config = Config::default();
    config.api.bearer_token = Some("secret-token".to_string());
    let client = RemoteClient::with_base_url(&config, server.uri());

    Mock::given(method("POST"))
        .and(path("/api/demo/Os/ordens/"))
        .and(header("authorization", "Bearer secret-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;

    let entry = common::order_entry(common::sample_payload());
    let body = client.deliver(&entry).await.expect("deliver failed");

    assert_eq!(body, json!({"ok": true}));
}

#[tokio::test]
async fn test_deliver_empty_body_becomes_null() {
    let (server, client) = common::setup().await;

    Mock::given(method("DELETE"))
        .and(path("/api/demo/Os/ordens/42/"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let entry = QueuedOperation::new(HttpAction::Delete, "Os/ordens/42/", json!({}), None);
    let body = client.deliver(&entry).await.expect("deliver failed");

    assert_eq!(body, serde_json::Value::Null);
}

#[tokio::test]
async fn test_deliver_business_rejection_is_discardable() {
    let (server, client) = common::setup().await;

    Mock::given(method("POST"))
        .and(path("/api/demo/Os/ordens/"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "detail": "Estoque negativo para o produto 77"
        })))
        .mount(&server)
        .await;

    let entry = common::order_entry(common::sample_payload());
    let error = client.deliver(&entry).await.expect_err("expected rejection");

    assert!(error.is_business());
    assert!(!error.is_connectivity());
}

#[tokio::test]
async fn test_deliver_server_error_keeps_status() {
    let (server, client) = common::setup().await;

    Mock::given(method("POST"))
        .and(path("/api/demo/Os/ordens/"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .mount(&server)
        .await;

    let entry = common::order_entry(common::sample_payload());
    let error = client.deliver(&entry).await.expect_err("expected rejection");

    match error {
        RemoteError::Status { status, ref message } => {
            assert_eq!(status, 500);
            assert!(message.contains("internal error"));
        }
        other => panic!("Expected status error, got {:?}", other),
    }
    assert!(!error.is_business());
}

#[tokio::test]
async fn test_deliver_unreachable_backend_is_connectivity() {
    let config = Config::default();
    // Port 9 (discard) refuses connections immediately.
    let client = RemoteClient::with_base_url(&config, "http://127.0.0.1:9");

    let entry = common::order_entry(common::sample_payload());
    let error = client.deliver(&entry).await.expect_err("expected failure");

    assert!(error.is_connectivity());
}

#[tokio::test]
async fn test_probe_reports_online_for_ok_response() {
    let (server, client) = common::setup().await;

    Mock::given(method("HEAD"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    assert!(client.probe_connectivity().await);
}

#[tokio::test]
async fn test_probe_treats_client_errors_as_online() {
    let (server, client) = common::setup().await;

    // A 404 still proves the backend answered.
    Mock::given(method("HEAD"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    assert!(client.probe_connectivity().await);
}

#[tokio::test]
async fn test_probe_reports_offline_for_server_error() {
    let (server, client) = common::setup().await;

    Mock::given(method("HEAD"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    assert!(!client.probe_connectivity().await);
}

#[tokio::test]
async fn test_probe_reports_offline_when_unreachable() {
    let config = Config::default();
    let client = RemoteClient::with_base_url(&config, "http://127.0.0.1:9");

    assert!(!client.probe_connectivity().await);
}
