//! HTTP route handlers.

pub mod chat;
pub mod health;
pub mod index;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the main Axum router with all routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(index::routes())
        .merge(health::routes())
        .merge(chat::routes())
        // Uploads are forwarded whole; no size cap.
        .layer(DefaultBodyLimit::disable())
        .layer(TraceLayer::new_for_http())
        // Mirrors the request origin so credentials can be allowed.
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}
