// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Prediction endpoint tests for POST /predict
//!
//! These tests verify that the predict_handler correctly:
//! - Rejects requests without a usable image upload (400 + `"error"` body)
//! - Rejects bytes that do not decode as an image
//! - Degrades gracefully once input validation passes
//!
//! Validation-tier tests run against a state without model weights;
//! inference tests require a model file and are marked #[ignore].

use axum::body::Body;
use axum::http::{Request, StatusCode};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use fabstir_detect_node::api::http_server::{router, AppState};
use fabstir_detect_node::vision::labels::coco_labels;
use fabstir_detect_node::vision::YoloDetector;
use std::sync::Arc;
use tower::ServiceExt;

// Model path (only used by #[ignore] tests)
const MODEL_PATH: &str = "models/yolov8n.onnx";

// 1x1 red PNG - minimal valid image
const TINY_PNG_BASE64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z8DwHwAFBQIAX8jx0gAAAABJRU5ErkJggg==";

const BOUNDARY: &str = "x-test-boundary";

/// Helper: multipart/form-data request for POST /predict with one part
fn multipart_request(field_name: &str, filename: Option<&str>, content: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field_name}\"")
            .as_bytes(),
    );
    if let Some(name) = filename {
        body.extend_from_slice(format!("; filename=\"{name}\"").as_bytes());
    }
    body.extend_from_slice(b"\r\nContent-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/predict")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

/// Helper: send a request and parse the JSON response body
async fn send(state: AppState, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = router(state).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn tiny_png() -> Vec<u8> {
    STANDARD.decode(TINY_PNG_BASE64).unwrap()
}

/// Helper: state with a real detector, or None when weights are absent
async fn setup_state_with_model() -> Option<AppState> {
    let detector = YoloDetector::new(MODEL_PATH, coco_labels()).await.ok()?;
    Some(AppState::new(Arc::new(detector)))
}

// =============================================================================
// Input Validation Tests (No Model Required)
// =============================================================================

/// Test 1: 400 when the form has no `image` field
#[tokio::test]
async fn test_missing_image_field() {
    let request = multipart_request("file", Some("photo.png"), &tiny_png());
    let (status, body) = send(AppState::new_for_test(), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = body["error"].as_str().expect("error key present");
    assert!(message.contains("no image file"), "got: {}", message);
}

/// Test 2: 400 when the `image` field has an empty filename
#[tokio::test]
async fn test_empty_filename() {
    let request = multipart_request("image", Some(""), &tiny_png());
    let (status, body) = send(AppState::new_for_test(), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = body["error"].as_str().expect("error key present");
    assert!(message.contains("empty filename"), "got: {}", message);
}

/// Test 3: an `image` part without a filename is not a file upload
#[tokio::test]
async fn test_image_field_without_filename() {
    let request = multipart_request("image", None, b"plain value");
    let (status, body) = send(AppState::new_for_test(), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("no image file"));
}

/// Test 4: 400 when the uploaded bytes do not decode as an image
#[tokio::test]
async fn test_undecodable_bytes() {
    let request = multipart_request("image", Some("notes.txt"), b"this is not an image");
    let (status, body) = send(AppState::new_for_test(), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = body["error"].as_str().expect("error key present");
    assert!(message.contains("failed to decode image"), "got: {}", message);
}

/// Test 5: 400 with an `"error"` body for a malformed multipart payload
#[tokio::test]
async fn test_malformed_multipart_body() {
    let request = Request::builder()
        .method("POST")
        .uri("/predict")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from("not a multipart payload"))
        .unwrap();
    let (status, body) = send(AppState::new_for_test(), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.get("error").is_some());
}

/// Test 6: uploads over the 16 MB ceiling are rejected with a client error
#[tokio::test]
async fn test_oversized_upload_rejected() {
    let oversized = vec![0u8; 16 * 1024 * 1024 + 1];
    let request = multipart_request("image", Some("huge.png"), &oversized);
    let (status, body) = send(AppState::new_for_test(), request).await;

    assert!(status.is_client_error(), "got status {}", status);
    assert!(body.get("error").is_some());
}

// =============================================================================
// Service Availability Tests
// =============================================================================

/// Test 7: 503 when no detection model is loaded (test-only state; a normally
/// started process aborts at startup if the model fails to load)
#[tokio::test]
async fn test_no_model_returns_service_unavailable() {
    let request = multipart_request("image", Some("photo.png"), &tiny_png());
    let (status, body) = send(AppState::new_for_test(), request).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].as_str().unwrap().contains("model"));
}

// =============================================================================
// Inference Tests (Require Model)
// =============================================================================

/// Test 8: a valid image yields a well-formed success response
#[tokio::test]
#[ignore] // Requires model files
async fn test_predict_success_shape() {
    let state = match setup_state_with_model().await {
        Some(state) => state,
        None => return, // Skip if model not available
    };

    let request = multipart_request("image", Some("photo.png"), &tiny_png());
    let (status, body) = send(state, request).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["predictions"].is_array());
    assert!(body["annotated_image"].is_string() || body["annotated_image"].is_null());
    if let Some(data_uri) = body["annotated_image"].as_str() {
        assert!(data_uri.starts_with("data:image/png;base64,"));
    }
}

/// Test 9: an image with no detectable objects still succeeds with an
/// empty predictions list
#[tokio::test]
#[ignore] // Requires model files
async fn test_predict_blank_image_empty_predictions() {
    let state = match setup_state_with_model().await {
        Some(state) => state,
        None => return,
    };

    // Encode a uniform gray image; nothing for the model to find
    let blank = image::RgbImage::from_pixel(640, 640, image::Rgb([128, 128, 128]));
    let mut png_bytes = Vec::new();
    blank
        .write_to(
            &mut std::io::Cursor::new(&mut png_bytes),
            image::ImageFormat::Png,
        )
        .unwrap();

    let request = multipart_request("image", Some("blank.png"), &png_bytes);
    let (status, body) = send(state, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["predictions"].as_array().unwrap().len(), 0);
}

/// Test 10: every prediction's class_name matches the label table at class_id
#[tokio::test]
#[ignore] // Requires model files
async fn test_predict_class_names_match_label_table() {
    let state = match setup_state_with_model().await {
        Some(state) => state,
        None => return,
    };
    let labels = coco_labels();

    let request = multipart_request("image", Some("photo.png"), &tiny_png());
    let (status, body) = send(state, request).await;
    assert_eq!(status, StatusCode::OK);

    for prediction in body["predictions"].as_array().unwrap() {
        let class_id = prediction["class_id"].as_u64().unwrap() as usize;
        let class_name = prediction["class_name"].as_str().unwrap();
        assert_eq!(labels[class_id], class_name);

        let confidence = prediction["confidence"].as_f64().unwrap();
        assert!((0.0..=1.0).contains(&confidence));
        assert!(prediction["xmin"].as_f64().unwrap() <= prediction["xmax"].as_f64().unwrap());
        assert!(prediction["ymin"].as_f64().unwrap() <= prediction["ymax"].as_f64().unwrap());
    }
}
