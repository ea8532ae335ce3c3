// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision processing module for CPU-based object detection
//!
//! This module provides:
//! - Upload decoding and annotated-image encoding
//! - Letterbox preprocessing into NCHW tensors
//! - YOLO-family ONNX inference and output parsing
//! - Box drawing for the annotated response image
//!
//! Inference runs on CPU only.

pub mod annotate;
pub mod detector;
pub mod image_utils;
pub mod labels;
pub mod preprocessing;

pub use detector::{Detection, DetectorConfig, YoloDetector};
pub use image_utils::{
    decode_image_bytes, detect_format, encode_png_data_uri, ImageError, ImageInfo,
};
