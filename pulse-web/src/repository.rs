//! Canonical session/feedback store with durable JSON snapshots
//!
//! `PulseRepository` is the single source of truth for sessions and
//! feedback. All reads take the shared side of one reader/writer lock and
//! all mutations take the exclusive side for the full critical section
//! including the snapshot rewrite, so concurrent writers never interleave
//! their durable writes and summaries never observe a torn session/
//! feedback pair.
//!
//! A mutation is complete only once the snapshot write succeeds. A failed
//! write propagates to the caller with in-memory state already mutated;
//! memory and disk then diverge until the next successful mutation. There
//! is no rollback or retry.

use pulse_common::config::StorageConfig;
use pulse_common::models::{
    normalize_code, CreateFeedbackRequest, CreateSessionRequest, Feedback, PulseData, Session,
    SessionSummary, CODE_ALPHABET, CODE_LENGTH,
};
use pulse_common::{sentiment, time, Error, Result};
use rand::Rng;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

/// Speaker recorded when a session is created without one
const DEFAULT_SPEAKER: &str = "Guest Speaker";

/// Lock-guarded repository of all sessions and feedback
pub struct PulseRepository {
    data: RwLock<PulseData>,
    data_file: PathBuf,
    max_feedback_per_session: usize,
}

impl PulseRepository {
    /// Open the repository, loading the last snapshot from disk
    ///
    /// A missing, unreadable, or malformed snapshot falls back to the seed
    /// dataset, which is persisted immediately. Load failures never
    /// surface to the caller; only the initial persist can fail here.
    pub fn open(config: &StorageConfig) -> Result<Self> {
        if let Some(directory) = config.data_file.parent() {
            if !directory.as_os_str().is_empty() {
                fs::create_dir_all(directory)?;
            }
        }

        let data = Self::load_snapshot(&config.data_file).unwrap_or_else(Self::seed_data);

        let repository = Self {
            data: RwLock::new(data),
            data_file: config.data_file.clone(),
            max_feedback_per_session: config.max_feedback_per_session,
        };

        {
            let data = repository.data.read().unwrap();
            repository.save(&data)?;
        }

        info!("Pulse data file: {}", repository.data_file.display());
        Ok(repository)
    }

    /// All sessions ordered by start time ascending
    pub fn sessions(&self) -> Vec<Session> {
        let data = self.data.read().unwrap();
        let mut sessions = data.sessions.clone();
        sessions.sort_by_key(|s| s.start_utc);
        sessions
    }

    /// Look up one session by code, case-insensitively
    pub fn session(&self, code: &str) -> Option<Session> {
        let normalized = normalize_code(code);
        let data = self.data.read().unwrap();
        data.sessions
            .iter()
            .find(|s| s.code.eq_ignore_ascii_case(&normalized))
            .cloned()
    }

    /// Create a new session with a freshly generated unique code
    ///
    /// Fails with [`Error::InvalidInput`] when the trimmed title is empty.
    /// A blank speaker falls back to a placeholder and a missing start
    /// time defaults to one hour from now.
    pub fn create_session(&self, request: &CreateSessionRequest) -> Result<Session> {
        let title = request.title.trim().to_string();
        if title.is_empty() {
            return Err(Error::InvalidInput("Title is required".to_string()));
        }

        let speaker = request.speaker.trim();
        let speaker = if speaker.is_empty() {
            DEFAULT_SPEAKER.to_string()
        } else {
            speaker.to_string()
        };

        let mut data = self.data.write().unwrap();
        let session = Session {
            code: Self::generate_session_code(&data),
            title,
            speaker,
            start_utc: request.start_utc.unwrap_or_else(time::default_session_start),
            created_utc: time::now(),
        };

        data.sessions.push(session.clone());
        self.save(&data)?;
        Ok(session)
    }

    /// Store one feedback entry for an existing session
    ///
    /// Fails with [`Error::NotFound`] when no session matches the code.
    /// The comment is trimmed (blank becomes absent) and scored once;
    /// retention trimming runs inside the same critical section as the
    /// insert. Rating range is a boundary-layer concern: whatever value
    /// arrives here is stored.
    pub fn add_feedback(&self, request: &CreateFeedbackRequest) -> Result<Feedback> {
        let normalized = normalize_code(&request.session_code);
        let comment = request
            .comment
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);

        let mut data = self.data.write().unwrap();
        let session_code = data
            .sessions
            .iter()
            .find(|s| s.code.eq_ignore_ascii_case(&normalized))
            .map(|s| s.code.clone())
            .ok_or_else(|| Error::NotFound(format!("session {}", normalized)))?;

        let feedback = Feedback {
            id: Uuid::new_v4(),
            session_code,
            rating: request.rating,
            sentiment_score: sentiment::score(comment.as_deref().unwrap_or("")),
            comment,
            created_utc: time::now(),
        };

        data.feedback_entries.push(feedback.clone());
        self.trim_feedback(&mut data, &feedback.session_code);
        self.save(&data)?;
        Ok(feedback)
    }

    /// Most recent feedback for a session, newest first
    ///
    /// Returns an empty list for an unknown session; callers check
    /// session existence separately.
    pub fn feedback(&self, code: &str, take: usize) -> Vec<Feedback> {
        let normalized = normalize_code(code);
        let data = self.data.read().unwrap();
        let mut entries: Vec<Feedback> = data
            .feedback_entries
            .iter()
            .filter(|f| f.session_code.eq_ignore_ascii_case(&normalized))
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.created_utc.cmp(&a.created_utc));
        entries.truncate(take);
        entries
    }

    /// Aggregate summary for one session, or `None` when the code is unknown
    pub fn summary(&self, code: &str) -> Option<SessionSummary> {
        let normalized = normalize_code(code);
        let data = self.data.read().unwrap();
        data.sessions
            .iter()
            .find(|s| s.code.eq_ignore_ascii_case(&normalized))
            .map(|session| Self::build_summary(&data, session))
    }

    /// Summaries for all sessions ordered by start time ascending
    pub fn summaries(&self) -> Vec<SessionSummary> {
        let data = self.data.read().unwrap();
        let mut summaries: Vec<SessionSummary> = data
            .sessions
            .iter()
            .map(|session| Self::build_summary(&data, session))
            .collect();
        summaries.sort_by_key(|s| s.start_utc);
        summaries
    }

    fn build_summary(data: &PulseData, session: &Session) -> SessionSummary {
        let feedback: Vec<&Feedback> = data
            .feedback_entries
            .iter()
            .filter(|f| f.session_code.eq_ignore_ascii_case(&session.code))
            .collect();

        let total = feedback.len();
        let (average_rating, sentiment_average, positive_share) = if total > 0 {
            (
                feedback.iter().map(|f| f.rating as f64).sum::<f64>() / total as f64,
                feedback.iter().map(|f| f.sentiment_score as f64).sum::<f64>() / total as f64,
                feedback.iter().filter(|f| f.sentiment_score > 0).count() as f64 / total as f64,
            )
        } else {
            (0.0, 0.0, 0.0)
        };

        SessionSummary {
            code: session.code.clone(),
            title: session.title.clone(),
            speaker: session.speaker.clone(),
            start_utc: session.start_utc,
            total_responses: total,
            average_rating,
            positive_share,
            sentiment_average,
            last_updated_utc: feedback.iter().map(|f| f.created_utc).max(),
        }
    }

    /// Drop a session's oldest feedback beyond the configured cap
    ///
    /// Runs under the exclusive lock together with the insert that
    /// triggered it. A cap of 0 means unlimited.
    fn trim_feedback(&self, data: &mut PulseData, session_code: &str) {
        if self.max_feedback_per_session == 0 {
            return;
        }

        let mut entries: Vec<(chrono::DateTime<chrono::Utc>, Uuid)> = data
            .feedback_entries
            .iter()
            .filter(|f| f.session_code.eq_ignore_ascii_case(session_code))
            .map(|f| (f.created_utc, f.id))
            .collect();
        entries.sort_by(|a, b| b.0.cmp(&a.0));

        let overflow: HashSet<Uuid> = entries
            .into_iter()
            .skip(self.max_feedback_per_session)
            .map(|(_, id)| id)
            .collect();
        if overflow.is_empty() {
            return;
        }

        data.feedback_entries.retain(|f| !overflow.contains(&f.id));
    }

    /// Draw 6 characters from the code alphabet, redrawing the whole code
    /// until it is unused among stored sessions
    ///
    /// The loop is unbounded on purpose: with a 32^6 code space a redraw
    /// is already rare, so a retry cap would only add a failure mode.
    fn generate_session_code(data: &PulseData) -> String {
        let alphabet = CODE_ALPHABET.as_bytes();
        let mut rng = rand::thread_rng();

        loop {
            let code: String = (0..CODE_LENGTH)
                .map(|_| alphabet[rng.gen_range(0..alphabet.len())] as char)
                .collect();

            if !data
                .sessions
                .iter()
                .any(|s| s.code.eq_ignore_ascii_case(&code))
            {
                return code;
            }
        }
    }

    fn load_snapshot(path: &Path) -> Option<PulseData> {
        if !path.exists() {
            return None;
        }

        let parsed = fs::read(path)
            .map_err(Error::from)
            .and_then(|bytes| Ok(serde_json::from_slice::<PulseData>(&bytes)?));

        match parsed {
            Ok(data) => Some(data),
            Err(e) => {
                warn!(
                    "Ignoring unreadable snapshot {}, reseeding: {}",
                    path.display(),
                    e
                );
                None
            }
        }
    }

    /// Rewrite the full snapshot atomically (temp file + rename)
    ///
    /// Called with the lock already held by the mutating operation, so two
    /// writers can never interleave their snapshot writes.
    fn save(&self, data: &PulseData) -> Result<()> {
        let json = serde_json::to_vec_pretty(data)?;
        let tmp = self.data_file.with_extension("json.tmp");
        fs::write(&tmp, &json)?;
        fs::rename(&tmp, &self.data_file)?;
        Ok(())
    }

    fn seed_data() -> PulseData {
        let now = time::now();

        let session_one = Session {
            code: "TALK42".to_string(),
            title: "Build Your First Live Dashboard".to_string(),
            speaker: "Pulse Team".to_string(),
            start_utc: now + chrono::Duration::hours(1),
            created_utc: now,
        };

        let session_two = Session {
            code: "WKSHP7".to_string(),
            title: "Realtime Feedback in 15 Minutes".to_string(),
            speaker: "Student Lead".to_string(),
            start_utc: now + chrono::Duration::hours(2),
            created_utc: now,
        };

        let seed_feedback = |session: &Session, rating: i32, comment: &str, minutes_ago: i64| {
            Feedback {
                id: Uuid::new_v4(),
                session_code: session.code.clone(),
                rating,
                comment: Some(comment.to_string()),
                sentiment_score: sentiment::score(comment),
                created_utc: now - chrono::Duration::minutes(minutes_ago),
            }
        };

        let feedback_entries = vec![
            seed_feedback(&session_one, 5, "Great pace and clear demos", 28),
            seed_feedback(&session_one, 4, "Useful examples, slightly fast", 12),
            seed_feedback(&session_two, 5, "Awesome intro to live summaries", 18),
        ];

        PulseData {
            sessions: vec![session_one, session_two],
            feedback_entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn test_config(dir: &TempDir, max_feedback: usize) -> StorageConfig {
        StorageConfig {
            data_file: dir.path().join("pulse.json"),
            max_feedback_per_session: max_feedback,
        }
    }

    fn open_repository(dir: &TempDir, max_feedback: usize) -> PulseRepository {
        PulseRepository::open(&test_config(dir, max_feedback)).expect("repository should open")
    }

    fn create_session(repository: &PulseRepository, title: &str) -> Session {
        repository
            .create_session(&CreateSessionRequest {
                title: title.to_string(),
                ..Default::default()
            })
            .expect("session should be created")
    }

    fn submit(repository: &PulseRepository, code: &str, rating: i32, comment: &str) -> Feedback {
        repository
            .add_feedback(&CreateFeedbackRequest {
                session_code: code.to_string(),
                rating,
                comment: Some(comment.to_string()),
                submitted_by: None,
            })
            .expect("feedback should be stored")
    }

    #[test]
    fn test_missing_snapshot_falls_back_to_seed() {
        let dir = TempDir::new().unwrap();
        let repository = open_repository(&dir, 200);

        let sessions = repository.sessions();
        assert_eq!(sessions.len(), 2);
        // Seed snapshot is persisted immediately
        assert!(test_config(&dir, 200).data_file.exists());
    }

    #[test]
    fn test_corrupt_snapshot_falls_back_to_seed() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir, 200);
        std::fs::write(&config.data_file, b"{ not json").unwrap();

        let repository = PulseRepository::open(&config).unwrap();
        assert_eq!(repository.sessions().len(), 2);

        // The rewritten snapshot is valid again
        let bytes = std::fs::read(&config.data_file).unwrap();
        assert!(serde_json::from_slice::<PulseData>(&bytes).is_ok());
    }

    #[test]
    fn test_sessions_are_ordered_by_start_time() {
        let dir = TempDir::new().unwrap();
        let repository = open_repository(&dir, 200);

        let sessions = repository.sessions();
        for pair in sessions.windows(2) {
            assert!(pair[0].start_utc <= pair[1].start_utc);
        }
    }

    #[test]
    fn test_create_session_rejects_blank_title() {
        let dir = TempDir::new().unwrap();
        let repository = open_repository(&dir, 200);

        let result = repository.create_session(&CreateSessionRequest {
            title: "   ".to_string(),
            ..Default::default()
        });
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_create_session_defaults_speaker_and_start() {
        let dir = TempDir::new().unwrap();
        let repository = open_repository(&dir, 200);

        let before = time::now();
        let session = create_session(&repository, "Intro to APIs");
        assert_eq!(session.speaker, "Guest Speaker");
        assert!(session.start_utc > before);

        let found = repository.session(&session.code.to_lowercase());
        assert_eq!(found.unwrap().title, "Intro to APIs");
    }

    #[test]
    fn test_generated_codes_match_alphabet() {
        let dir = TempDir::new().unwrap();
        let repository = open_repository(&dir, 200);

        for _ in 0..20 {
            let session = create_session(&repository, "Talk");
            assert_eq!(session.code.len(), CODE_LENGTH);
            assert!(session.code.chars().all(|c| CODE_ALPHABET.contains(c)));
        }
    }

    #[test]
    fn test_code_generation_skips_occupied_codes() {
        // Adversarially pre-populate a slice of the code space and make
        // sure the generator still terminates with a unique draw
        let mut data = PulseData::default();
        let now = time::now();
        for _ in 0..2_000 {
            let code = PulseRepository::generate_session_code(&data);
            data.sessions.push(Session {
                code,
                title: "occupied".to_string(),
                speaker: DEFAULT_SPEAKER.to_string(),
                start_utc: now,
                created_utc: now,
            });
        }

        let codes: HashSet<String> = data.sessions.iter().map(|s| s.code.clone()).collect();
        assert_eq!(codes.len(), data.sessions.len());
    }

    #[test]
    fn test_concurrent_creation_yields_unique_codes() {
        let dir = TempDir::new().unwrap();
        let repository = Arc::new(open_repository(&dir, 200));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let repository = Arc::clone(&repository);
                std::thread::spawn(move || {
                    (0..10)
                        .map(|_| create_session(&repository, "Concurrent").code)
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut codes = HashSet::new();
        for handle in handles {
            for code in handle.join().unwrap() {
                assert!(codes.insert(code.to_ascii_uppercase()), "duplicate code");
            }
        }
        assert_eq!(codes.len(), 80);
    }

    #[test]
    fn test_add_feedback_requires_existing_session() {
        let dir = TempDir::new().unwrap();
        let repository = open_repository(&dir, 200);

        let result = repository.add_feedback(&CreateFeedbackRequest {
            session_code: "NOSUCH".to_string(),
            rating: 5,
            comment: None,
            submitted_by: None,
        });
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_add_feedback_trims_and_scores_comment() {
        let dir = TempDir::new().unwrap();
        let repository = open_repository(&dir, 200);
        let session = create_session(&repository, "Scoring");

        let feedback = submit(&repository, &session.code, 5, "  great session  ");
        assert_eq!(feedback.comment.as_deref(), Some("great session"));
        assert_eq!(feedback.sentiment_score, 1);
        assert_eq!(feedback.session_code, session.code);
    }

    #[test]
    fn test_blank_comment_is_stored_absent_and_scores_zero() {
        let dir = TempDir::new().unwrap();
        let repository = open_repository(&dir, 200);
        let session = create_session(&repository, "Quiet");

        let feedback = repository
            .add_feedback(&CreateFeedbackRequest {
                session_code: session.code.clone(),
                rating: 3,
                comment: Some("   ".to_string()),
                submitted_by: None,
            })
            .unwrap();
        assert!(feedback.comment.is_none());
        assert_eq!(feedback.sentiment_score, 0);
    }

    #[test]
    fn test_summary_for_session_without_feedback() {
        let dir = TempDir::new().unwrap();
        let repository = open_repository(&dir, 200);
        let session = create_session(&repository, "Empty");

        let summary = repository.summary(&session.code).unwrap();
        assert_eq!(summary.total_responses, 0);
        assert_eq!(summary.average_rating, 0.0);
        assert_eq!(summary.sentiment_average, 0.0);
        assert_eq!(summary.positive_share, 0.0);
        assert!(summary.last_updated_utc.is_none());
    }

    #[test]
    fn test_summary_recomputes_from_retained_feedback() {
        let dir = TempDir::new().unwrap();
        let repository = open_repository(&dir, 200);
        let session = create_session(&repository, "Intro to APIs");

        submit(&repository, &session.code, 5, "great session");
        let summary = repository.summary(&session.code).unwrap();
        assert_eq!(summary.total_responses, 1);
        assert_eq!(summary.average_rating, 5.0);
        assert_eq!(summary.positive_share, 1.0);
        assert!(summary.last_updated_utc.is_some());

        submit(&repository, &session.code, 2, "boring middle part");
        let summary = repository.summary(&session.code).unwrap();
        assert_eq!(summary.total_responses, 2);
        assert_eq!(summary.average_rating, 3.5);
        assert_eq!(summary.positive_share, 0.5);
        assert_eq!(summary.sentiment_average, 0.0);
    }

    #[test]
    fn test_retention_cap_evicts_oldest_entries() {
        let dir = TempDir::new().unwrap();
        let repository = open_repository(&dir, 3);
        let session = create_session(&repository, "Busy");

        for i in 1..=5 {
            submit(&repository, &session.code, 4, &format!("entry {}", i));
            // Distinct creation timestamps so "oldest" is well defined
            std::thread::sleep(std::time::Duration::from_millis(2));
        }

        let entries = repository.feedback(&session.code, 50);
        assert_eq!(entries.len(), 3);
        let comments: Vec<_> = entries
            .iter()
            .map(|f| f.comment.clone().unwrap())
            .collect();
        assert_eq!(comments, vec!["entry 5", "entry 4", "entry 3"]);

        let summary = repository.summary(&session.code).unwrap();
        assert_eq!(summary.total_responses, 3);
    }

    #[test]
    fn test_retention_cap_zero_means_unlimited() {
        let dir = TempDir::new().unwrap();
        let repository = open_repository(&dir, 0);
        let session = create_session(&repository, "Unlimited");

        for i in 0..25 {
            submit(&repository, &session.code, 4, &format!("entry {}", i));
        }
        assert_eq!(repository.summary(&session.code).unwrap().total_responses, 25);
    }

    #[test]
    fn test_retention_only_affects_the_submitted_session() {
        let dir = TempDir::new().unwrap();
        let repository = open_repository(&dir, 2);
        let busy = create_session(&repository, "Busy");
        let calm = create_session(&repository, "Calm");

        submit(&repository, &calm.code, 5, "calm one");
        for i in 0..4 {
            submit(&repository, &busy.code, 4, &format!("busy {}", i));
        }

        assert_eq!(repository.summary(&busy.code).unwrap().total_responses, 2);
        assert_eq!(repository.summary(&calm.code).unwrap().total_responses, 1);
    }

    #[test]
    fn test_feedback_listing_is_newest_first_and_limited() {
        let dir = TempDir::new().unwrap();
        let repository = open_repository(&dir, 200);
        let session = create_session(&repository, "Ordered");

        for i in 1..=4 {
            submit(&repository, &session.code, i, &format!("entry {}", i));
            std::thread::sleep(std::time::Duration::from_millis(2));
        }

        let entries = repository.feedback(&session.code, 2);
        assert_eq!(entries.len(), 2);
        assert!(entries[0].created_utc >= entries[1].created_utc);
        assert_eq!(entries[0].comment.as_deref(), Some("entry 4"));

        assert!(repository.feedback("NOSUCH", 10).is_empty());
    }

    #[test]
    fn test_snapshot_round_trips_across_restart() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir, 200);

        let (session, feedback) = {
            let repository = PulseRepository::open(&config).unwrap();
            let session = create_session(&repository, "Persistent");
            let feedback = submit(&repository, &session.code, 5, "great and useful");
            (session, feedback)
        };

        let reopened = PulseRepository::open(&config).unwrap();
        let found = reopened.session(&session.code).expect("session survives restart");
        assert_eq!(found.title, session.title);
        assert_eq!(found.created_utc, session.created_utc);

        let entries = reopened.feedback(&session.code, 10);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, feedback.id);
        assert_eq!(entries[0].sentiment_score, feedback.sentiment_score);
        assert_eq!(entries[0].created_utc, feedback.created_utc);

        // Seed sessions are still present alongside the new one
        assert_eq!(reopened.sessions().len(), 3);
    }
}
