// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! YOLO object detection model
//!
//! Wraps an ONNX-exported YOLO-family model in an ONNX Runtime session and
//! turns its raw output tensor into per-object detections in source-image
//! pixel coordinates.

use anyhow::{Context, Result};
use image::DynamicImage;
use ndarray::{s, ArrayViewD, Axis, Ix3};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::preprocessing::{preprocess_for_detection, Letterbox};

/// A detected object in source-image pixel coordinates
#[derive(Debug, Clone)]
pub struct Detection {
    /// Left edge
    pub xmin: f32,
    /// Top edge
    pub ymin: f32,
    /// Right edge
    pub xmax: f32,
    /// Bottom edge
    pub ymax: f32,
    /// Confidence score (0.0-1.0)
    pub confidence: f32,
    /// Class index into the label table
    pub class_id: usize,
    /// Resolved class name
    pub class_name: String,
}

/// Inference parameters
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Square model input size in pixels
    pub input_size: u32,
    /// Minimum confidence for a candidate to become a detection
    pub confidence_threshold: f32,
    /// Cap on detections returned per image
    pub max_detections: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            input_size: 640,
            confidence_threshold: 0.25,
            max_detections: 100,
        }
    }
}

/// YOLO detection model
///
/// Loaded once at startup and shared read-only across requests.
/// Runs on CPU only.
#[derive(Clone)]
pub struct YoloDetector {
    /// ONNX Runtime session (thread-safe)
    session: Arc<Mutex<Session>>,
    /// Model input name
    input_name: String,
    /// Class name table, indexed by class id
    labels: Vec<String>,
    config: DetectorConfig,
}

impl std::fmt::Debug for YoloDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YoloDetector")
            .field("input_name", &self.input_name)
            .field("num_labels", &self.labels.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl YoloDetector {
    /// Load the detection model from a file
    ///
    /// # Arguments
    /// - `model_path`: Path to the ONNX model file
    /// - `labels`: Class name table for resolving class indices
    ///
    /// # Errors
    /// Returns error if:
    /// - Model file not found
    /// - ONNX Runtime initialization fails
    pub async fn new<P: AsRef<Path>>(model_path: P, labels: Vec<String>) -> Result<Self> {
        let model_path = model_path.as_ref();

        // Validate path exists
        if !model_path.exists() {
            anyhow::bail!("Detection model not found: {}", model_path.display());
        }

        info!("Loading detection model from {}", model_path.display());

        // Load ONNX model with CPU-only execution
        let session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(4)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .context(format!(
                "Failed to load detection model from {}",
                model_path.display()
            ))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "images".to_string());

        debug!("Detection model input: {}", input_name);
        info!(
            "✅ Detection model loaded successfully (CPU-only, {} classes)",
            labels.len()
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            labels,
            config: DetectorConfig::default(),
        })
    }

    /// Override the confidence threshold
    pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
        self.config.confidence_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Override the detection cap
    pub fn with_max_detections(mut self, max_detections: usize) -> Self {
        self.config.max_detections = max_detections;
        self
    }

    /// Current confidence threshold
    pub fn confidence_threshold(&self) -> f32 {
        self.config.confidence_threshold
    }

    /// The class name table this detector resolves against
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Run detection on a decoded image
    ///
    /// Preprocesses to the model input size, runs the forward pass, and maps
    /// the surviving candidates back to source-image pixel coordinates.
    pub fn detect(&self, image: &DynamicImage) -> Result<Vec<Detection>> {
        let (input, letterbox) = preprocess_for_detection(image, self.config.input_size);

        // Run inference
        let mut session = self.session.lock().unwrap();

        let input_value =
            Value::from_array(input).context("Failed to create input tensor")?;

        let outputs = session
            .run(ort::inputs![&self.input_name => input_value])
            .context("Detection inference failed")?;

        let output_tensor = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;

        debug!("Detection output shape: {:?}", output_tensor.shape());

        parse_predictions(
            output_tensor.view(),
            &letterbox,
            &self.labels,
            self.config.confidence_threshold,
            self.config.max_detections,
        )
    }
}

/// Parse a raw YOLO output tensor into detections
///
/// Expects the `[1, 4 + num_classes, num_candidates]` layout of ONNX-exported
/// YOLOv8/v11 models: per candidate a cx/cy/w/h box in letterbox space
/// followed by one score per class. Candidates whose best class score clears
/// the threshold are mapped back to source coordinates, clamped to the image
/// bounds, sorted by score and capped.
pub(crate) fn parse_predictions(
    output: ArrayViewD<f32>,
    letterbox: &Letterbox,
    labels: &[String],
    confidence_threshold: f32,
    max_detections: usize,
) -> Result<Vec<Detection>> {
    let output = output
        .into_dimensionality::<Ix3>()
        .context("Unexpected output rank, expected [1, attrs, candidates]")?;

    let shape = output.shape();
    if shape[0] != 1 || shape[1] < 5 {
        anyhow::bail!(
            "Unexpected output shape: {:?}, expected [1, 4 + num_classes, num_candidates]",
            shape
        );
    }

    let view = output.index_axis(Axis(0), 0);
    let num_candidates = view.shape()[1];

    let max_x = letterbox.source_width as f32;
    let max_y = letterbox.source_height as f32;

    let mut detections = Vec::new();

    for i in 0..num_candidates {
        let scores = view.slice(s![4.., i]);
        let Some((class_id, &max_score)) = scores
            .indexed_iter()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        else {
            continue;
        };

        if max_score <= confidence_threshold {
            continue;
        }

        let cx = view[[0, i]];
        let cy = view[[1, i]];
        let w = view[[2, i]];
        let h = view[[3, i]];

        let (x1, y1) = letterbox.to_source(cx - w / 2.0, cy - h / 2.0);
        let (x2, y2) = letterbox.to_source(cx + w / 2.0, cy + h / 2.0);

        detections.push(Detection {
            xmin: x1.clamp(0.0, max_x),
            ymin: y1.clamp(0.0, max_y),
            xmax: x2.clamp(0.0, max_x),
            ymax: y2.clamp(0.0, max_y),
            confidence: max_score,
            class_id,
            class_name: labels
                .get(class_id)
                .cloned()
                .unwrap_or_else(|| "object".to_string()),
        });
    }

    detections.sort_unstable_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    detections.truncate(max_detections);

    Ok(detections)
}
