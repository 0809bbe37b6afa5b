//! Feedback submission

use axum::{extract::State, http::StatusCode, Json};
use pulse_common::models::{CreateFeedbackRequest, Feedback, PulseUpdate};
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// POST /api/feedback
///
/// Validates the boundary-layer constraints (non-blank session code,
/// rating in 1-5), stores the feedback, and pushes a `(feedback, summary)`
/// update to every live subscriber of the session.
pub async fn submit_feedback(
    State(state): State<AppState>,
    Json(request): Json<CreateFeedbackRequest>,
) -> ApiResult<(StatusCode, Json<Feedback>)> {
    if request.session_code.trim().is_empty() {
        return Err(ApiError::BadRequest("Session code is required".to_string()));
    }
    if !(1..=5).contains(&request.rating) {
        return Err(ApiError::BadRequest(
            "Rating must be between 1 and 5".to_string(),
        ));
    }

    let feedback = state.repository.add_feedback(&request)?;

    // The summary is recomputed after the insert; a concurrently stored
    // entry may already be included, which only makes the update fresher.
    if let Some(summary) = state.repository.summary(&feedback.session_code) {
        debug!(
            "Publishing update for session {} ({} responses)",
            summary.code, summary.total_responses
        );
        state.updates.publish(PulseUpdate {
            feedback: feedback.clone(),
            summary,
        });
    }

    Ok((StatusCode::CREATED, Json(feedback)))
}
