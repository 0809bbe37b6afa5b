//! Session listing, creation, summaries, and feedback history

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use pulse_common::models::{CreateSessionRequest, Feedback, Session, SessionSummary};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Default and maximum page size for feedback history
const DEFAULT_FEEDBACK_TAKE: usize = 12;
const MAX_FEEDBACK_TAKE: usize = 50;

/// Query parameters for feedback history
#[derive(Debug, Deserialize)]
pub struct FeedbackQuery {
    /// Number of entries to return, clamped to [1, 50]
    pub take: Option<usize>,
}

/// GET /api/sessions
///
/// All sessions ordered by start time ascending.
pub async fn list_sessions(State(state): State<AppState>) -> Json<Vec<Session>> {
    Json(state.repository.sessions())
}

/// POST /api/sessions
///
/// Create a session; 400 when the title is blank.
pub async fn create_session(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> ApiResult<(StatusCode, Json<Session>)> {
    let session = state.repository.create_session(&request)?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// GET /api/sessions/:code
pub async fn get_session(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> ApiResult<Json<Session>> {
    state
        .repository
        .session(&code)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("session {}", code)))
}

/// GET /api/sessions/:code/summary
pub async fn get_summary(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> ApiResult<Json<SessionSummary>> {
    state
        .repository
        .summary(&code)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("session {}", code)))
}

/// GET /api/sessions/:code/feedback?take=N
///
/// Most recent feedback for one session, newest first.
pub async fn list_feedback(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(query): Query<FeedbackQuery>,
) -> ApiResult<Json<Vec<Feedback>>> {
    if state.repository.session(&code).is_none() {
        return Err(ApiError::NotFound(format!("session {}", code)));
    }

    let take = query
        .take
        .unwrap_or(DEFAULT_FEEDBACK_TAKE)
        .clamp(1, MAX_FEEDBACK_TAKE);
    Ok(Json(state.repository.feedback(&code, take)))
}

/// GET /api/summaries
///
/// Summaries for all sessions ordered by start time ascending.
pub async fn list_summaries(State(state): State<AppState>) -> Json<Vec<SessionSummary>> {
    Json(state.repository.summaries())
}
