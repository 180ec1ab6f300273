//! HTTP API module
//!
//! This module contains the control surface for the local room: timer
//! actions, avatar movement, status messages and a room snapshot.

pub mod handlers;
pub mod responses;

use std::sync::Arc;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use handlers::*;

/// Create the HTTP router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/timer/toggle", post(toggle_handler))
        .route("/timer/reset", post(reset_handler))
        .route("/timer/skip", post(skip_handler))
        .route("/timer/mode", post(mode_handler))
        .route("/timer/durations", post(durations_handler))
        .route("/move", post(move_handler))
        .route("/status-message", post(status_message_handler))
        .route("/hover", post(hover_handler))
        .route("/low-power", post(low_power_handler))
        .route("/status", get(status_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
