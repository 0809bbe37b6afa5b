//! Keyword-lexicon sentiment scoring for feedback comments
//!
//! Deliberately simple: count positive and negative lexicon hits over a
//! lowercased, punctuation-split comment and clamp the balance to
//! [`SCORE_MIN`, `SCORE_MAX`]. The score is computed once when feedback
//! is stored and never recomputed.

use once_cell::sync::Lazy;
use std::collections::HashSet;

/// Lower bound of the sentiment range
pub const SCORE_MIN: i32 = -3;

/// Upper bound of the sentiment range
pub const SCORE_MAX: i32 = 3;

static POSITIVE_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "amazing",
        "awesome",
        "clear",
        "confident",
        "cool",
        "easy",
        "excellent",
        "fast",
        "good",
        "great",
        "helpful",
        "insightful",
        "love",
        "nice",
        "smooth",
        "useful",
    ]
    .into_iter()
    .collect()
});

static NEGATIVE_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "bad", "boring", "confusing", "hard", "issue", "lag", "slow", "pain", "poor", "rough",
        "unclear", "stuck", "tough", "waste",
    ]
    .into_iter()
    .collect()
});

const SEPARATORS: &[char] = &[' ', ',', '.', '!', '?', ';', ':', '/', '\\', '\t', '\n', '\r'];

/// Score a comment: +1 per positive lexicon hit, -1 per negative hit,
/// clamped to [-3, 3]. Blank input scores 0.
pub fn score(comment: &str) -> i32 {
    if comment.trim().is_empty() {
        return 0;
    }

    let lowered = comment.to_lowercase();
    let mut score = 0;
    for token in lowered.split(SEPARATORS).filter(|t| !t.is_empty()) {
        if POSITIVE_WORDS.contains(token) {
            score += 1;
        }
        if NEGATIVE_WORDS.contains(token) {
            score -= 1;
        }
    }

    score.clamp(SCORE_MIN, SCORE_MAX)
}
