//! Live update fan-out for dashboard subscribers
//!
//! Provides the per-session publish/subscribe stream that drives the
//! dashboard's live feed. Each subscriber owns an unbounded tokio mpsc
//! channel (single consumer, many producers); publishing enqueues
//! non-blockingly onto every current subscriber of the affected session
//! and silently skips closed channels, so a slow or disconnected viewer
//! never blocks or fails a feedback submission.
//!
//! The registry mutex guards subscriber-set membership only. Sends happen
//! on sender clones taken out of the lock, so publication to one session
//! never serializes against subscribe/unsubscribe traffic longer than the
//! map mutation itself.

use crate::models::{normalize_code, PulseUpdate};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

type SubscriberMap = HashMap<String, HashMap<Uuid, mpsc::UnboundedSender<PulseUpdate>>>;

/// Per-session update broadcaster
///
/// Cheap to clone; all clones share one subscriber registry keyed by the
/// normalized (uppercase) session code. Sessions with no subscribers hold
/// no registry state: the last unsubscribe removes the per-session set.
#[derive(Clone, Default)]
pub struct UpdateStream {
    streams: Arc<Mutex<SubscriberMap>>,
}

impl UpdateStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber for one session's updates
    ///
    /// Subscribing to a code with no matching session is allowed — the
    /// dashboard may connect before the session exists. The subscription
    /// simply receives nothing until a matching publish occurs.
    pub fn subscribe(&self, session_code: &str) -> Subscription {
        let session_code = normalize_code(session_code);
        let (tx, rx) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();

        self.streams
            .lock()
            .unwrap()
            .entry(session_code.clone())
            .or_default()
            .insert(id, tx);
        debug!("Subscribed {} to session {}", id, session_code);

        Subscription {
            session_code,
            id,
            rx,
            stream: self.clone(),
        }
    }

    /// Remove a subscription and close its queue
    ///
    /// Safe to call redundantly; the subscription also removes itself on
    /// drop, so an SSE handler that just drops the handle is equivalent.
    pub fn unsubscribe(&self, subscription: &Subscription) {
        self.remove(&subscription.session_code, subscription.id);
    }

    /// Deliver an update to every current subscriber of its session
    ///
    /// Best-effort: no-op when nobody is subscribed, and a closed queue is
    /// skipped silently. Never an error to the publisher.
    pub fn publish(&self, update: PulseUpdate) {
        let targets: Vec<mpsc::UnboundedSender<PulseUpdate>> = {
            let streams = self.streams.lock().unwrap();
            match streams.get(&normalize_code(&update.feedback.session_code)) {
                Some(group) => group.values().cloned().collect(),
                None => return,
            }
        };

        for tx in targets {
            let _ = tx.send(update.clone());
        }
    }

    /// Current number of subscribers for a session
    pub fn subscriber_count(&self, session_code: &str) -> usize {
        self.streams
            .lock()
            .unwrap()
            .get(&normalize_code(session_code))
            .map(|group| group.len())
            .unwrap_or(0)
    }

    fn remove(&self, session_code: &str, id: Uuid) {
        let mut streams = self.streams.lock().unwrap();
        if let Some(group) = streams.get_mut(session_code) {
            // Dropping the sender closes the channel; the consumer's recv
            // loop drains anything already queued and then ends.
            if group.remove(&id).is_some() {
                debug!("Unsubscribed {} from session {}", id, session_code);
            }
            if group.is_empty() {
                streams.remove(session_code);
            }
        }
    }
}

/// A live consumer's registered interest in one session's update stream
///
/// Owns the receiving half of the subscription queue. Exactly one
/// consumer reads it; every feedback submission for the session may write
/// to it. Unsubscribes itself from the registry on drop.
pub struct Subscription {
    session_code: String,
    id: Uuid,
    rx: mpsc::UnboundedReceiver<PulseUpdate>,
    stream: UpdateStream,
}

impl Subscription {
    /// Normalized session code this subscription is registered under
    pub fn session_code(&self) -> &str {
        &self.session_code
    }

    /// Unique subscription identity
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Wait for the next update
    ///
    /// Returns `None` once the subscription has been unsubscribed and any
    /// already-queued updates are drained.
    pub async fn recv(&mut self) -> Option<PulseUpdate> {
        self.rx.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.stream.remove(&self.session_code, self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Feedback, SessionSummary};
    use crate::time;

    fn sample_update(session_code: &str) -> PulseUpdate {
        let now = time::now();
        PulseUpdate {
            feedback: Feedback {
                id: Uuid::new_v4(),
                session_code: session_code.to_string(),
                rating: 5,
                comment: Some("great session".to_string()),
                sentiment_score: 1,
                created_utc: now,
            },
            summary: SessionSummary {
                code: session_code.to_string(),
                title: "Sample".to_string(),
                speaker: "Guest Speaker".to_string(),
                start_utc: now,
                total_responses: 1,
                average_rating: 5.0,
                positive_share: 1.0,
                sentiment_average: 1.0,
                last_updated_utc: Some(now),
            },
        }
    }

    #[tokio::test]
    async fn test_publish_reaches_matching_subscriber() {
        let stream = UpdateStream::new();
        let mut subscription = stream.subscribe("TALK42");

        stream.publish(sample_update("TALK42"));

        let update = subscription.recv().await.expect("should receive update");
        assert_eq!(update.feedback.session_code, "TALK42");
        assert_eq!(update.summary.total_responses, 1);
    }

    #[tokio::test]
    async fn test_publish_matches_codes_case_insensitively() {
        let stream = UpdateStream::new();
        let mut subscription = stream.subscribe("talk42");

        stream.publish(sample_update("Talk42"));

        assert!(subscription.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_publish_does_not_cross_sessions() {
        let stream = UpdateStream::new();
        let mut talk = stream.subscribe("TALK42");
        let mut workshop = stream.subscribe("WKSHP7");

        stream.publish(sample_update("TALK42"));
        stream.unsubscribe(&workshop);

        assert!(talk.recv().await.is_some());
        // The other subscriber's queue closes without ever seeing the update
        assert!(workshop.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_noop() {
        let stream = UpdateStream::new();
        stream.publish(sample_update("TALK42"));
        assert_eq!(stream.subscriber_count("TALK42"), 0);
    }

    #[tokio::test]
    async fn test_unsubscribe_closes_queue_and_stops_delivery() {
        let stream = UpdateStream::new();
        let mut subscription = stream.subscribe("TALK42");

        stream.unsubscribe(&subscription);
        stream.publish(sample_update("TALK42"));

        assert!(subscription.recv().await.is_none());
        assert_eq!(stream.subscriber_count("TALK42"), 0);
    }

    #[tokio::test]
    async fn test_unsubscribe_is_idempotent() {
        let stream = UpdateStream::new();
        let subscription = stream.subscribe("TALK42");

        stream.unsubscribe(&subscription);
        stream.unsubscribe(&subscription);

        assert_eq!(stream.subscriber_count("TALK42"), 0);
    }

    #[tokio::test]
    async fn test_queued_updates_drain_before_close() {
        let stream = UpdateStream::new();
        let mut subscription = stream.subscribe("TALK42");

        stream.publish(sample_update("TALK42"));
        stream.publish(sample_update("TALK42"));
        stream.unsubscribe(&subscription);

        assert!(subscription.recv().await.is_some());
        assert!(subscription.recv().await.is_some());
        assert!(subscription.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_drop_removes_subscription_from_registry() {
        let stream = UpdateStream::new();
        let subscription = stream.subscribe("TALK42");
        assert_eq!(stream.subscriber_count("TALK42"), 1);

        drop(subscription);
        assert_eq!(stream.subscriber_count("TALK42"), 0);
    }

    #[tokio::test]
    async fn test_updates_arrive_in_publish_order() {
        let stream = UpdateStream::new();
        let mut subscription = stream.subscribe("TALK42");

        for rating in 1..=5 {
            let mut update = sample_update("TALK42");
            update.feedback.rating = rating;
            stream.publish(update);
        }

        for expected in 1..=5 {
            let update = subscription.recv().await.expect("should receive update");
            assert_eq!(update.feedback.rating, expected);
        }
    }

    #[tokio::test]
    async fn test_fanout_delivers_to_every_subscriber() {
        let stream = UpdateStream::new();
        let mut first = stream.subscribe("TALK42");
        let mut second = stream.subscribe("TALK42");
        assert_eq!(stream.subscriber_count("TALK42"), 2);

        stream.publish(sample_update("TALK42"));

        assert!(first.recv().await.is_some());
        assert!(second.recv().await.is_some());
    }
}
