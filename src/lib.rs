// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod config;
pub mod vision;

pub use api::errors::{ApiError, ErrorResponse};
pub use api::http_server::{router, start_server, AppState};
pub use api::predict::{predict_handler, PredictResponse, Prediction};
pub use config::ServerConfig;
pub use vision::{Detection, DetectorConfig, YoloDetector};
