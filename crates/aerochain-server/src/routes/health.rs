use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router};

use crate::state::AppState;

pub const SYSTEM_STATUS: &str = "Aerochain Core Online";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health))
}

/// GET /health: fixed liveness payload, no dependencies checked.
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "system": SYSTEM_STATUS,
    }))
}
