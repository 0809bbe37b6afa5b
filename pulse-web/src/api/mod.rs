//! HTTP API handlers for pulse-web

pub mod feedback;
pub mod health;
pub mod sessions;
pub mod sse;

pub use feedback::submit_feedback;
pub use health::health_routes;
pub use sessions::{create_session, get_session, get_summary, list_feedback, list_sessions, list_summaries};
pub use sse::session_stream;
