// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Prediction endpoint handler

use axum::extract::{Multipart, State};
use axum::Json;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::response::{PredictResponse, Prediction};
use crate::api::errors::ApiError;
use crate::api::http_server::AppState;
use crate::vision::annotate::annotate;
use crate::vision::image_utils::{decode_image_bytes, encode_png_data_uri};

/// POST /predict - Detect objects in an uploaded image
///
/// Accepts multipart/form-data with a file field named `image` and returns
/// the detected bounding boxes plus an annotated copy of the input.
///
/// # Request
/// - `image`: the image file (PNG, JPG, WebP, GIF, BMP, TIFF), at most 16 MB
///
/// # Response
/// - `predictions`: detections with `xmin`/`ymin`/`xmax`/`ymax` pixel
///   coordinates, `confidence`, `class_id` and `class_name`
/// - `annotated_image`: PNG data URI with the boxes drawn in, or null when
///   rendering failed
///
/// # Errors
/// - 400 Bad Request: missing file field, empty filename, or bytes that do
///   not decode as an image
/// - 503 Service Unavailable: detection model not loaded
///
/// Failures past input validation degrade instead of erroring: a detection
/// extraction error yields an empty `predictions` list, an annotation error
/// yields a null `annotated_image`.
pub async fn predict_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<PredictResponse>, ApiError> {
    // 1. Pull the `image` file field out of the multipart form
    let mut image_bytes = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidRequest(format!("invalid multipart form data: {}", e)))?
    {
        if field.name() != Some("image") {
            continue;
        }

        // A part without a filename is a plain form value, not a file upload
        let filename = match field.file_name() {
            Some(name) => name.to_string(),
            None => continue,
        };
        if filename.is_empty() {
            return Err(ApiError::InvalidRequest("empty filename".to_string()));
        }

        let bytes = field.bytes().await.map_err(|e| {
            ApiError::InvalidRequest(format!("failed to read image field: {}", e))
        })?;
        image_bytes = Some((filename, bytes));
        break;
    }

    let (filename, bytes) = image_bytes
        .ok_or_else(|| ApiError::InvalidRequest("no image file in request".to_string()))?;

    // 2. Decode the upload into an in-memory image buffer
    let (image, image_info) = decode_image_bytes(&bytes).map_err(|e| {
        warn!("Failed to decode upload '{}': {}", filename, e);
        ApiError::InvalidRequest(format!("failed to decode image: {}", e))
    })?;

    debug!(
        "Decoded image '{}': {}x{}, {} bytes",
        filename, image_info.width, image_info.height, image_info.size_bytes
    );

    // 3. Get the detector from state
    let detector = state.detector.as_ref().ok_or_else(|| {
        warn!("Detection model not loaded");
        ApiError::ServiceUnavailable("detection model not loaded".to_string())
    })?;

    // 4. Run inference with the detector's default thresholds
    let started = Instant::now();
    let detections = match detector.detect(&image) {
        Ok(detections) => detections,
        Err(e) => {
            // Degrade to an empty detection list rather than failing the request
            warn!("Error extracting detections: {}", e);
            Vec::new()
        }
    };

    // 5. Render the annotated copy and encode it as a PNG data URI
    let annotated_image = match encode_png_data_uri(&annotate(&image, &detections)) {
        Ok(data_uri) => Some(data_uri),
        Err(e) => {
            warn!("Could not create annotated image: {}", e);
            None
        }
    };

    info!(
        "Detection complete: {} objects in {}x{} image, {}ms",
        detections.len(),
        image_info.width,
        image_info.height,
        started.elapsed().as_millis()
    );

    // 6. Return JSON
    Ok(Json(PredictResponse {
        predictions: detections.into_iter().map(Prediction::from).collect(),
        annotated_image,
    }))
}
