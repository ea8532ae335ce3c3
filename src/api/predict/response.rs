// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Prediction response types

use serde::{Deserialize, Serialize};

use crate::vision::Detection;

/// One detected object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    /// Left edge, in source-image pixel coordinates
    pub xmin: f32,
    /// Top edge
    pub ymin: f32,
    /// Right edge
    pub xmax: f32,
    /// Bottom edge
    pub ymax: f32,
    /// Confidence score (0.0-1.0)
    pub confidence: f32,
    /// Class index into the model's label table
    pub class_id: usize,
    /// Human-readable class name
    pub class_name: String,
}

impl From<Detection> for Prediction {
    fn from(detection: Detection) -> Self {
        Self {
            xmin: detection.xmin,
            ymin: detection.ymin,
            xmax: detection.xmax,
            ymax: detection.ymax,
            confidence: detection.confidence,
            class_id: detection.class_id,
            class_name: detection.class_name,
        }
    }
}

/// Response from the prediction endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    /// Detected objects, in model output order
    pub predictions: Vec<Prediction>,
    /// Annotated copy of the input as a PNG data URI, or null when
    /// rendering failed
    pub annotated_image: Option<String>,
}
