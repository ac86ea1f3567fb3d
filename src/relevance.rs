// src/relevance.rs
//! Keyword-overlap relevance between a question and a tomo's text.
//!
//! Per keyword (whitespace token longer than 3 chars), occurrences in the text
//! are counted case-insensitively. Each occurrence earns a weight that shrinks
//! as the keyword gets more frequent (5 down to 1), so distinctive words rank a
//! tomo above generic ones. The weight of the n-th occurrence only depends on n,
//! which keeps the score non-decreasing as occurrences are added.

use std::sync::Arc;
use tracing::debug;

use crate::corpus::{Volume, VolumeId};

pub const MIN_KEYWORD_LEN: usize = 4;
pub const MAX_OCCURRENCE_WEIGHT: u64 = 5;
pub const MIN_OCCURRENCE_WEIGHT: u64 = 1;

/// Result of scoring one tomo against one question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relevance {
    pub volume: VolumeId,
    pub score: u64,
    /// Keywords that occurred at least once.
    pub matched: Vec<String>,
}

/// Lowercased whitespace tokens longer than 3 chars, edge punctuation removed.
pub fn query_keywords(query: &str) -> Vec<String> {
    query
        .split_whitespace()
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|t| t.chars().count() >= MIN_KEYWORD_LEN)
        .collect()
}

/// Weight of the n-th occurrence (1-based): 5 for the first 29, then 10/(n/10), floored at 1.
pub fn occurrence_weight(n: usize) -> u64 {
    let tens = (n / 10).max(1) as u64;
    (10 / tens).clamp(MIN_OCCURRENCE_WEIGHT, MAX_OCCURRENCE_WEIGHT)
}

/// Sum of `occurrence_weight(1..=occurrences)`.
pub fn keyword_contribution(occurrences: usize) -> u64 {
    let mut total = 0u64;
    let mut n = 1usize;
    while n <= occurrences {
        // weight is constant over each decade
        let decade_end = ((n / 10) * 10 + 9).min(occurrences);
        total += occurrence_weight(n) * (decade_end - n + 1) as u64;
        n = decade_end + 1;
    }
    total
}

/// Score `query` against already-lowercased text.
pub fn score_text(query: &str, lower_text: &str) -> (u64, Vec<String>) {
    let mut score = 0u64;
    let mut matched = Vec::new();
    for kw in query_keywords(query) {
        let occurrences = lower_text.matches(kw.as_str()).count();
        if occurrences == 0 {
            continue;
        }
        score += keyword_contribution(occurrences);
        matched.push(kw);
    }
    (score, matched)
}

pub fn score(query: &str, volume: &Volume) -> Relevance {
    let (score, matched) = score_text(query, &volume.lower);
    Relevance {
        volume: volume.id,
        score,
        matched,
    }
}

/// Tomos with a positive score, best first; ties keep ascending tomo order.
pub fn rank_volumes(query: &str, volumes: &[Arc<Volume>]) -> Vec<Relevance> {
    let mut ranked: Vec<Relevance> = volumes
        .iter()
        .map(|v| score(query, v))
        .filter(|r| r.score > 0)
        .collect();
    ranked.sort_by(|a, b| b.score.cmp(&a.score));
    debug!(
        target: "relevance",
        ranked = ?ranked.iter().map(|r| (r.volume.get(), r.score)).collect::<Vec<_>>(),
        "tomos ranked"
    );
    ranked
}
