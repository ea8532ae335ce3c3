// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Health endpoint tests for GET /health
//!
//! The health check returns a fixed acknowledgment payload unconditionally,
//! regardless of prior request history.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use fabstir_detect_node::api::http_server::{router, AppState};
use tower::ServiceExt;

async fn get_health(state: AppState) -> (StatusCode, serde_json::Value) {
    let response = router(state)
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_health_returns_ok() {
    let (status, body) = get_health(AppState::new_for_test()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_health_unaffected_by_failed_predict() {
    let state = AppState::new_for_test();

    // A predict request with no file field fails with a client error
    let response = router(state.clone())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/predict")
                .header(
                    "content-type",
                    "multipart/form-data; boundary=x-test-boundary",
                )
                .body(Body::from("--x-test-boundary--\r\n"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(response.status().is_client_error());

    // The health check still reports ok afterwards
    let (status, body) = get_health(state).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!({ "status": "ok" }));
}
