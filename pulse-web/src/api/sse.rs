//! Server-Sent Events (SSE) live feed per session
//!
//! Each connected dashboard subscribes to one session's update stream and
//! receives an `update` event for every stored feedback entry until it
//! disconnects. Dropping the stream (client disconnect) drops the
//! subscription, which unsubscribes it from the fan-out registry.

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// GET /api/sessions/:code/stream - SSE live update feed
///
/// Streams events:
/// - ConnectionStatus (sent once on connect)
/// - update (JSON `PulseUpdate` per stored feedback entry)
pub async fn session_stream(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let session = state
        .repository
        .session(&code)
        .ok_or_else(|| ApiError::NotFound(format!("session {}", code)))?;

    let mut subscription = state.updates.subscribe(&session.code);
    info!("New SSE client for session {}", session.code);

    let stream = async_stream::stream! {
        // Send initial connected status
        yield Ok(Event::default()
            .event("ConnectionStatus")
            .data("connected"));

        while let Some(update) = subscription.recv().await {
            match serde_json::to_string(&update) {
                Ok(payload) => yield Ok(Event::default().event("update").data(payload)),
                Err(e) => debug!("Skipping undeliverable update: {}", e),
            }
        }

        debug!("SSE subscription closed for session {}", subscription.session_code());
    };

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("heartbeat"),
    ))
}
