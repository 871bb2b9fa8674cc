//! Integration test: real reqwest transport against a scripted local server.
//!
//! Covers the retry scenarios end to end (status sequences, attempt counts,
//! header injection, request-id stability) and a refused connection.

mod common;

use std::sync::{Arc, Mutex};

use common::status_server::{self, Reply};
use rrc_core::config::{ClientConfig, RetryConfig};
use rrc_core::credentials::StaticToken;
use rrc_core::retry::NoJitter;
use rrc_core::transport::NetworkErrorCode;
use rrc_core::{ApiRequest, ErrorCategory, RequestPipeline};

fn pipeline_for(base_url: &str) -> RequestPipeline {
    let cfg = ClientConfig {
        base_url: base_url.to_string(),
        timeout_ms: 2_000,
        token_env: None,
        retry: Some(RetryConfig {
            retries: 3,
            initial_delay_ms: 5,
            max_delay_ms: 20,
            ..RetryConfig::default()
        }),
    };
    RequestPipeline::builder(cfg)
        .credentials(Arc::new(StaticToken::new("integration-token")))
        .jitter(Arc::new(NoJitter))
        .build()
        .expect("pipeline")
}

#[tokio::test]
async fn three_unavailable_then_ok_returns_payload_after_three_retries() {
    let (url, recorder) = status_server::start(vec![
        Reply::status(503),
        Reply::status(503),
        Reply::status(503),
        Reply::json(200, r#"{"orders":[{"id":1}]}"#),
    ]);
    let p = pipeline_for(&url);

    let resp = p.get("orders").await.expect("eventual success");
    assert_eq!(resp.status, 200);
    let body: serde_json::Value = resp.json().unwrap();
    assert_eq!(body["orders"][0]["id"], 1);

    let requests = recorder.requests();
    assert_eq!(requests.len(), 4);
    let first_id = requests[0].header("x-request-id").unwrap().to_string();
    assert!(requests
        .iter()
        .all(|r| r.header("x-request-id") == Some(first_id.as_str())));
    assert!(requests
        .iter()
        .all(|r| r.header("authorization") == Some("Bearer integration-token")));
    assert!(requests.iter().all(|r| r.path == "/api/orders"));
}

#[tokio::test]
async fn not_found_is_raised_without_retry() {
    let (url, recorder) = status_server::start(vec![Reply::json(
        404,
        r#"{"message":"Order 42 does not exist","code":"ORDER_NOT_FOUND"}"#,
    )]);
    let p = pipeline_for(&url);

    let err = p.get("orders/42").await.unwrap_err();
    assert_eq!(err.category, ErrorCategory::Resource);
    assert_eq!(err.status_code, Some(404));
    assert_eq!(err.message, "Order 42 does not exist");
    assert_eq!(err.code.as_deref(), Some("ORDER_NOT_FOUND"));
    assert_eq!(recorder.count(), 1);
}

#[tokio::test]
async fn four_unavailable_exhausts_retries() {
    let (url, recorder) = status_server::start(vec![
        Reply::status(503),
        Reply::status(503),
        Reply::status(503),
        Reply::status(503),
    ]);
    let p = pipeline_for(&url);

    let err = p.get("inventory").await.unwrap_err();
    assert_eq!(err.status_code, Some(503));
    assert_eq!(err.category, ErrorCategory::Internal);
    assert_eq!(recorder.count(), 4);
}

#[tokio::test]
async fn retryable_patch_survives_two_bad_gateways() {
    let (url, recorder) = status_server::start(vec![
        Reply::status(502),
        Reply::status(502),
        Reply::json(200, r#"{"updated":true}"#),
    ]);
    let p = pipeline_for(&url);
    let retries = Arc::new(Mutex::new(0u32));
    let counter = retries.clone();

    let resp = p
        .send(
            ApiRequest::patch("credits/9", serde_json::json!({"amount": 15}))
                .retryable()
                .on_retry(move |_| *counter.lock().unwrap() += 1),
        )
        .await
        .expect("patch succeeds");
    assert_eq!(resp.status, 200);
    assert_eq!(*retries.lock().unwrap(), 2);

    let requests = recorder.requests();
    assert_eq!(requests.len(), 3);
    assert!(requests.iter().all(|r| r.method == "PATCH"));
    assert!(requests.iter().all(|r| r.body == br#"{"amount":15}"#));
    assert_eq!(requests[0].header("content-type"), Some("application/json"));
}

#[tokio::test]
async fn validation_errors_reach_the_caller() {
    let (url, recorder) = status_server::start(vec![Reply::json(
        400,
        r#"{"message":"Invalid feedback","category":"VALIDATION",
            "errors":{"rating":["must be between 1 and 5"]},"trackingId":"fb-1"}"#,
    )]);
    let p = pipeline_for(&url);

    let err = p
        .post("feedback", serde_json::json!({"rating": 9}))
        .await
        .unwrap_err();
    assert_eq!(err.category, ErrorCategory::Validation);
    assert_eq!(err.field_errors("rating"), ["must be between 1 and 5".to_string()]);
    assert_eq!(err.tracking_id.as_deref(), Some("fb-1"));
    assert_eq!(recorder.count(), 1);
}

#[tokio::test]
async fn refused_connection_is_network_error_after_retries() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let p = pipeline_for(&format!("http://127.0.0.1:{port}/"));

    let err = p.get("anything").await.unwrap_err();
    assert_eq!(err.category, ErrorCategory::Network);
    assert!(!err.has_response());
    assert!(matches!(
        err.network_code,
        Some(NetworkErrorCode::ConnectionRefused) | Some(NetworkErrorCode::ConnectionReset)
    ));
}

#[tokio::test]
async fn malformed_header_fails_locally_without_reaching_server() {
    let (url, recorder) = status_server::start(vec![Reply::json(200, "{}")]);
    let p = pipeline_for(&url);
    let retries = Arc::new(Mutex::new(0u32));
    let counter = retries.clone();

    let err = p
        .send(
            ApiRequest::get("orders")
                .with_header("X-Bad", "a\nb")
                .on_retry(move |_| *counter.lock().unwrap() += 1),
        )
        .await
        .unwrap_err();
    assert_eq!(err.category, ErrorCategory::Client);
    assert_eq!(err.code.as_deref(), Some("INVALID_REQUEST"));
    assert!(err.network_code.is_none());
    assert_eq!(*retries.lock().unwrap(), 0);
    assert_eq!(recorder.count(), 0);
}
