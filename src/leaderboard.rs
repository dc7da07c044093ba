//! Leaderboard calculator
//!
//! Derives a deterministic ranked view from participant records. The view is
//! recomputed in full on every score change and never stored; participant
//! records remain the source of truth.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Participant;

/// One row of the derived leaderboard
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub participant_id: Uuid,
    pub name: String,
    pub score: u32,
    pub solved_count: u32,
}

/// Compute the ranked leaderboard.
///
/// Sort key: score desc, solved count desc, earliest solve time asc (a faster
/// solver ranks higher on a full tie), then join order asc as the final
/// deterministic tiebreak.
pub fn compute<'a, I>(participants: I) -> Vec<LeaderboardEntry>
where
    I: IntoIterator<Item = &'a Participant>,
{
    let mut ranked: Vec<&Participant> = participants.into_iter().collect();
    ranked.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| b.solved_count.cmp(&a.solved_count))
            .then_with(|| {
                let a_time = a.earliest_solve_ms().unwrap_or(u64::MAX);
                let b_time = b.earliest_solve_ms().unwrap_or(u64::MAX);
                a_time.cmp(&b_time)
            })
            .then_with(|| a.join_order.cmp(&b.join_order))
    });

    ranked
        .into_iter()
        .enumerate()
        .map(|(i, p)| LeaderboardEntry {
            rank: (i + 1) as u32,
            participant_id: p.id,
            name: p.name.clone(),
            score: p.score,
            solved_count: p.solved_count,
        })
        .collect()
}

/// Rank of one participant in the computed leaderboard
pub fn rank_of(leaderboard: &[LeaderboardEntry], participant_id: Uuid) -> Option<u32> {
    leaderboard
        .iter()
        .find(|e| e.participant_id == participant_id)
        .map(|e| e.rank)
}
