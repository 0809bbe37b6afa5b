//! Data models shared between the Pulse services
//!
//! All wire and snapshot serialization uses camelCase field names with
//! RFC 3339 timestamps, so the JSON snapshot round-trips across restarts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A tracked live talk/event, identified by a short join code
///
/// Sessions are create-only: once stored they are never updated or
/// deleted, and their code stays unique (case-insensitively) for the
/// process lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// 6-character join code from [`crate::models::CODE_ALPHABET`]
    pub code: String,
    pub title: String,
    pub speaker: String,
    /// Scheduled start of the session
    pub start_utc: DateTime<Utc>,
    pub created_utc: DateTime<Utc>,
}

/// One attendee's rating/comment tied to a session
///
/// Created only through the repository; never updated. May be deleted by
/// retention trimming when a per-session cap is configured.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub id: Uuid,
    /// Code of the session this feedback belongs to; always references a
    /// stored session at write time
    pub session_code: String,
    /// Star rating, 1-5 as submitted
    pub rating: i32,
    /// Trimmed free-text comment; blank submissions are stored as `None`
    pub comment: Option<String>,
    /// Lexicon sentiment in [-3, 3], scored once at creation
    pub sentiment_score: i32,
    pub created_utc: DateTime<Utc>,
}

/// Derived aggregate statistics for one session's feedback
///
/// Never persisted; recomputed from the stored feedback on every request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub code: String,
    pub title: String,
    pub speaker: String,
    pub start_utc: DateTime<Utc>,
    pub total_responses: usize,
    pub average_rating: f64,
    /// Fraction of feedback with a positive sentiment score
    pub positive_share: f64,
    pub sentiment_average: f64,
    /// Timestamp of the most recent feedback; `None` when there is none
    pub last_updated_utc: Option<DateTime<Utc>>,
}

/// Live update event broadcast to dashboard subscribers of one session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PulseUpdate {
    pub feedback: Feedback,
    pub summary: SessionSummary,
}

/// Full durable snapshot of all sessions and feedback
///
/// Serialized as a single JSON document and fully rewritten (never
/// appended) after each mutation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PulseData {
    pub sessions: Vec<Session>,
    pub feedback_entries: Vec<Feedback>,
}

/// Request body for POST /api/sessions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub speaker: String,
    /// Defaults to one hour from now when omitted
    #[serde(default)]
    pub start_utc: Option<DateTime<Utc>>,
}

/// Request body for POST /api/feedback
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFeedbackRequest {
    #[serde(default)]
    pub session_code: String,
    #[serde(default)]
    pub rating: i32,
    #[serde(default)]
    pub comment: Option<String>,
    /// Accepted on the wire for forward compatibility; not stored
    #[serde(default)]
    pub submitted_by: Option<String>,
}

/// Session code alphabet: uppercase letters and digits minus the
/// visually confusable 0/O and 1/I
pub const CODE_ALPHABET: &str = "ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Session code length
pub const CODE_LENGTH: usize = 6;

/// Canonical form of a session code for comparison and registry keys
pub fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}
