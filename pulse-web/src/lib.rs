//! pulse-web library - CampusPulse HTTP service
//!
//! Exposes the session/feedback API and the per-session live update
//! stream over SSE. The router is built here so integration tests can
//! drive it in-process.

use axum::Router;
use pulse_common::updates::UpdateStream;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod api;
pub mod error;
pub mod repository;
pub mod worker;

pub use repository::PulseRepository;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Canonical session/feedback store
    pub repository: Arc<PulseRepository>,
    /// Per-session live update fan-out
    pub updates: UpdateStream,
}

impl AppState {
    /// Create new application state
    pub fn new(repository: Arc<PulseRepository>, updates: UpdateStream) -> Self {
        Self {
            repository,
            updates,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    Router::new()
        .route("/api/sessions", get(api::list_sessions))
        .route("/api/sessions", post(api::create_session))
        .route("/api/sessions/:code", get(api::get_session))
        .route("/api/sessions/:code/summary", get(api::get_summary))
        .route("/api/sessions/:code/feedback", get(api::list_feedback))
        .route("/api/sessions/:code/stream", get(api::session_stream))
        .route("/api/summaries", get(api::list_summaries))
        .route("/api/feedback", post(api::submit_feedback))
        .merge(api::health_routes())
        .with_state(state)
        // Enable CORS for local dashboards
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
