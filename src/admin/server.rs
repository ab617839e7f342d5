use axum::{extract::State, routing::get, Json, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::debug;

use crate::{session::ChatSessionController, store::AdminSnapshot};

/// Health check and read-only stats for operators.
pub struct AdminServer {
    controller: ChatSessionController,
}

impl AdminServer {
    pub fn new(controller: ChatSessionController) -> Self {
        Self { controller }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route("/api/stats", get(stats_handler))
            .with_state(self.controller.clone())
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
    }
}

async fn health_handler() -> &'static str {
    "OK"
}

async fn stats_handler(State(controller): State<ChatSessionController>) -> Json<AdminSnapshot> {
    debug!("Admin stats requested");
    Json(controller.snapshot())
}
