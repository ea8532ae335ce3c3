// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Environment-backed server configuration

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

/// Configuration read once at startup
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Path to the ONNX detection model (required)
    pub model_path: PathBuf,
    /// Optional label file with one class name per line; the built-in
    /// COCO table is used when unset
    pub labels_path: Option<PathBuf>,
    /// Port the HTTP API listens on
    pub api_port: u16,
}

impl ServerConfig {
    /// Build configuration from environment variables
    ///
    /// - `MODEL_PATH`: required, the ONNX model file
    /// - `MODEL_LABELS`: optional label file for fine-tuned models
    /// - `API_PORT`: optional, defaults to 8080
    pub fn from_env() -> Result<Self> {
        let model_path = env::var("MODEL_PATH")
            .map(PathBuf::from)
            .context("MODEL_PATH is not set; point it at the ONNX detection model file")?;

        let labels_path = env::var("MODEL_LABELS").ok().map(PathBuf::from);

        let api_port = env::var("API_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .context("API_PORT must be a valid port number")?;

        Ok(Self {
            model_path,
            labels_path,
            api_port,
        })
    }
}
