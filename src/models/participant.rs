//! Participant state owned by a contest room

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-challenge progress for one participant.
///
/// `points_awarded` is set at most once (on the first fully-passing submission)
/// and never decreases; best counts only improve.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChallengeRecord {
    pub attempts: u32,
    pub best_passed: u32,
    pub best_total: u32,
    pub all_passed: bool,
    pub points_awarded: u32,
    /// Elapsed contest milliseconds at the first full pass
    pub first_full_pass_at_ms: Option<u64>,
}

/// A contest participant. Retained keyed by id across disconnects so that a
/// rejoin resumes from the persisted record rather than a blank slate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub id: Uuid,
    pub name: String,
    /// Order of first join, final deterministic leaderboard tiebreak
    pub join_order: u32,
    /// Sum of `points_awarded` across challenges; monotonically non-decreasing
    pub score: u32,
    pub solved_count: u32,
    /// Per-challenge records keyed by challenge index
    pub records: HashMap<usize, ChallengeRecord>,
}

impl Participant {
    pub fn new(id: Uuid, name: String, join_order: u32) -> Self {
        Self {
            id,
            name,
            join_order,
            score: 0,
            solved_count: 0,
            records: HashMap::new(),
        }
    }

    /// Challenge indices with at least one submission, for the rejoin snapshot
    pub fn submitted_indices(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = self
            .records
            .iter()
            .filter(|(_, r)| r.attempts > 0)
            .map(|(i, _)| *i)
            .collect();
        indices.sort_unstable();
        indices
    }

    /// Challenge indices fully solved, for the rejoin snapshot
    pub fn solved_indices(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = self
            .records
            .iter()
            .filter(|(_, r)| r.all_passed)
            .map(|(i, _)| *i)
            .collect();
        indices.sort_unstable();
        indices
    }

    /// Earliest full-pass time across solved challenges, for leaderboard tiebreaks
    pub fn earliest_solve_ms(&self) -> Option<u64> {
        self.records
            .values()
            .filter_map(|r| r.first_full_pass_at_ms)
            .min()
    }
}
