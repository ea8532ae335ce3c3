// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Prediction API endpoint module
//!
//! Provides POST /predict for running object detection on uploaded images.

pub mod handler;
pub mod response;

pub use handler::predict_handler;
pub use response::{PredictResponse, Prediction};
