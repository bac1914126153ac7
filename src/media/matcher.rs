//! Candidate scoring against Spotify metadata.
//!
//! Each candidate gets a composite score in `0.0..=1.0`:
//!
//! ```text
//! score = TEXT_WEIGHT * text_similarity + DURATION_WEIGHT * duration_closeness
//! ```
//!
//! Text similarity compares the folded `"artist title"` string against the
//! folded candidate title, blending edit-distance similarity with the share
//! of target words found in the candidate. Duration closeness is `1.0` for an
//! exact length and falls linearly to `0.5` at the tolerance edge; anything
//! further off is excluded outright.

use std::cmp::Ordering;

use tracing::debug;

use crate::{
    types::{Candidate, MatchResult, TrackMetadata},
    utils::normalize_text,
};

/// Candidates more than this many seconds away from the target are excluded.
pub const DEFAULT_DURATION_TOLERANCE_SECS: u32 = 10;

/// Best score below this is reported as no match.
pub const DEFAULT_MIN_SCORE: f64 = 0.6;

pub const TEXT_WEIGHT: f64 = 0.7;
pub const DURATION_WEIGHT: f64 = 0.3;

/// Subtracted from the text similarity when the candidate looks like a
/// different rendition of the song than the target.
pub const VARIANT_PENALTY: f64 = 0.15;

const VARIANT_MARKERS: &[&str] = &[
    "live",
    "cover",
    "karaoke",
    "remix",
    "instrumental",
    "acoustic",
    "nightcore",
    "sped up",
    "slowed",
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchPolicy {
    pub duration_tolerance_secs: u32,
    pub min_score: f64,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self {
            duration_tolerance_secs: DEFAULT_DURATION_TOLERANCE_SECS,
            min_score: DEFAULT_MIN_SCORE,
        }
    }
}

/// A candidate that survived the duration window.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    pub score: f64,
    /// Absolute duration difference, `None` when the backend reported none.
    pub duration_delta: Option<u32>,
}

pub fn text_similarity(target: &TrackMetadata, candidate_title: &str) -> f64 {
    let wanted = normalize_text(&target.display_name());
    let offered = normalize_text(candidate_title);
    if wanted.is_empty() || offered.is_empty() {
        return 0.0;
    }
    if wanted == offered {
        return 1.0;
    }

    let sequence = strsim::normalized_levenshtein(&wanted, &offered);

    let offered_words: Vec<&str> = offered.split_whitespace().collect();
    let wanted_words: Vec<&str> = wanted.split_whitespace().collect();
    let found = wanted_words
        .iter()
        .filter(|w| offered_words.contains(w))
        .count();
    let recall = found as f64 / wanted_words.len() as f64;

    let mut similarity = 0.5 * sequence + 0.5 * recall;

    let target_title = normalize_text(&target.title);
    let is_variant = VARIANT_MARKERS
        .iter()
        .any(|m| contains_phrase(&offered, m) && !contains_phrase(&target_title, m));
    if is_variant {
        similarity -= VARIANT_PENALTY;
    }

    similarity.clamp(0.0, 1.0)
}

/// Closeness in `0.5..=1.0` inside the tolerance window, `None` outside it.
/// Unknown candidate durations are kept with a closeness of `0.0`.
pub fn duration_closeness(target_secs: u32, candidate_secs: Option<u32>, tolerance: u32) -> Option<f64> {
    let Some(candidate_secs) = candidate_secs else {
        return Some(0.0);
    };

    let delta = target_secs.abs_diff(candidate_secs);
    if delta > tolerance {
        return None;
    }
    if tolerance == 0 {
        return Some(1.0);
    }
    Some(1.0 - delta as f64 / (2.0 * tolerance as f64))
}

/// Scores one candidate, `None` when it falls outside the duration window.
pub fn score(target: &TrackMetadata, candidate: &Candidate, policy: &MatchPolicy) -> Option<ScoredCandidate> {
    let closeness = duration_closeness(
        target.duration_secs,
        candidate.duration_secs,
        policy.duration_tolerance_secs,
    )?;
    let text = text_similarity(target, &candidate.title);

    Some(ScoredCandidate {
        candidate: candidate.clone(),
        score: TEXT_WEIGHT * text + DURATION_WEIGHT * closeness,
        duration_delta: candidate
            .duration_secs
            .map(|d| d.abs_diff(target.duration_secs)),
    })
}

/// Ordering where the preferred candidate sorts first: higher score, then
/// smaller duration delta, then the backend's own relevance rank.
pub fn preference(a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| {
            let da = a.duration_delta.unwrap_or(u32::MAX);
            let db = b.duration_delta.unwrap_or(u32::MAX);
            da.cmp(&db)
        })
        .then_with(|| a.candidate.rank.cmp(&b.candidate.rank))
}

/// Picks the best candidate for `target`, or [`MatchResult::NoMatch`] when
/// the list is empty or nothing reaches [`MatchPolicy::min_score`].
pub fn select(target: &TrackMetadata, candidates: &[Candidate], policy: &MatchPolicy) -> MatchResult {
    let mut scored: Vec<ScoredCandidate> = candidates
        .iter()
        .filter_map(|c| {
            let scored = score(target, c, policy);
            if scored.is_none() {
                debug!(track_id = %target.id, candidate = %c.title, "outside duration window");
            }
            scored
        })
        .collect();

    scored.sort_by(preference);

    match scored.into_iter().next() {
        Some(best) if best.score >= policy.min_score => {
            debug!(
                track_id = %target.id,
                candidate = %best.candidate.title,
                score = best.score,
                "selected candidate"
            );
            MatchResult::Matched {
                candidate: best.candidate,
                score: best.score,
            }
        }
        Some(best) => {
            debug!(
                track_id = %target.id,
                candidate = %best.candidate.title,
                score = best.score,
                min_score = policy.min_score,
                "best candidate below acceptance threshold"
            );
            MatchResult::NoMatch
        }
        None => MatchResult::NoMatch,
    }
}

fn contains_phrase(haystack: &str, phrase: &str) -> bool {
    format!(" {} ", haystack).contains(&format!(" {} ", phrase))
}
