// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use fabstir_detect_node::{
    api::http_server::{start_server, AppState},
    config::ServerConfig,
    vision::{labels, YoloDetector},
};
use std::{env, sync::Arc};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    println!("🚀 Starting Fabstir Detect Node...\n");

    let config = ServerConfig::from_env()?;

    let labels = match &config.labels_path {
        Some(path) => {
            println!("📋 Loading class labels from {}", path.display());
            labels::load_labels(path)?
        }
        None => labels::coco_labels(),
    };

    println!(
        "🧠 Loading detection model from {}...",
        config.model_path.display()
    );
    let detector = YoloDetector::new(&config.model_path, labels).await?;
    println!("✅ Model loaded.");

    let state = AppState::new(Arc::new(detector));

    let separator = "=".repeat(60);
    println!("\n{}", separator);
    println!("🎉 Fabstir Detect Node is running!");
    println!("{}", separator);
    println!(
        "Model:          {}",
        config
            .model_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "unknown".to_string())
    );
    println!("API Port:       {}", config.api_port);
    println!("\nAPI Endpoints:");
    println!("  Health:       http://localhost:{}/health", config.api_port);
    println!(
        "  Predict:      POST http://localhost:{}/predict",
        config.api_port
    );
    println!("\nTest with curl:");
    println!("  curl -X POST http://localhost:{}/predict \\", config.api_port);
    println!("    -F 'image=@photo.jpg'");
    println!("\nPress Ctrl+C to shutdown...");
    println!("{}\n", separator);

    start_server(state, config.api_port).await?;

    println!("👋 Goodbye!");
    Ok(())
}
