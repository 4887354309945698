// rate-limited streaming relay for chat completion APIs

pub mod config;
pub mod conversation;
pub mod error;
pub mod feature;
pub mod handlers;
pub mod identity;
pub mod janitor;
pub mod journal;
pub mod metrics;
pub mod models;
pub mod rate_limit;
pub mod relay;
pub mod session;
pub mod state;
pub mod visits;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::handlers::{
    admin_handler, contact_handler, health_handler, metrics_handler, start_handler,
    stream_handler,
};
use crate::state::AppState;
use crate::visits::record_visit;

//creating the router with routes
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/admin", get(admin_handler))
        .route("/contact", post(contact_handler))
        .route("/{feature}/start", post(start_handler))
        .route("/{feature}/stream", get(stream_handler))
        .layer(middleware::from_fn_with_state(Arc::clone(&state), record_visit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
