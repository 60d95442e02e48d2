use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use serde_json::json;
use std::sync::Arc;

/// GET /health - Health check endpoint
pub async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let registry = state.registry();
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.started_at.elapsed().as_secs(),
        "active_jobs": registry.active_count(),
        "jobs": registry.len(),
    }))
}
