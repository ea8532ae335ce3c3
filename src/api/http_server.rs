use axum::{
    extract::DefaultBodyLimit,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde_json::json;
use std::{net::SocketAddr, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::predict::predict_handler;
use crate::vision::image_utils::MAX_IMAGE_SIZE;
use crate::vision::YoloDetector;

#[derive(Clone)]
pub struct AppState {
    /// Detector shared across requests. `None` only in test harnesses;
    /// a normally started process aborts before serving if the model
    /// fails to load.
    pub detector: Option<Arc<YoloDetector>>,
}

impl AppState {
    pub fn new(detector: Arc<YoloDetector>) -> Self {
        Self {
            detector: Some(detector),
        }
    }

    /// State without a loaded model, for exercising the validation tier
    /// in tests.
    pub fn new_for_test() -> Self {
        Self { detector: None }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_handler))
        // Prediction endpoint
        .route("/predict", post(predict_handler))
        // Uploads are capped at 16 MB before the handler body runs
        .layer(DefaultBodyLimit::max(MAX_IMAGE_SIZE))
        // Allow cross-origin requests (for dev). In production, restrict origins.
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn start_server(state: AppState, port: u16) -> anyhow::Result<()> {
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("API server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}

async fn health_handler() -> impl IntoResponse {
    axum::response::Json(json!({ "status": "ok" }))
}
