//! Scoring engine
//!
//! Pure functions turning a judged submission plus the participant's prior
//! record into a point award and an updated record. Policy: full points on the
//! first fully-passing submission, zero otherwise. No partial credit, no
//! time-decay bonus. A challenge is scored at most once per participant, so a
//! participant's score never decreases.

use crate::judge::JudgeVerdict;
use crate::models::{Challenge, ChallengeRecord};

/// Result of scoring one submission
#[derive(Debug, Clone)]
pub struct ScoreOutcome {
    /// Points to add to the participant's score (0 unless first full pass)
    pub points_delta: u32,
    /// 1 exactly when this submission first solves the challenge, else 0
    pub solved_delta: u32,
    /// Updated per-challenge record
    pub record: ChallengeRecord,
}

/// Score a judged submission against the participant's prior record.
///
/// `elapsed_ms` is the contest time at which the submission was received,
/// recorded as the solve time on a first full pass.
pub fn score_submission(
    challenge: &Challenge,
    prior: &ChallengeRecord,
    verdict: &JudgeVerdict,
    elapsed_ms: u64,
) -> ScoreOutcome {
    let passed = verdict.passed_count();
    let total = verdict.total_count();

    let mut record = prior.clone();
    record.attempts = prior.attempts.saturating_add(1);
    // Best counts only improve, for display purposes
    if total > 0 && (record.best_total == 0 || passed > record.best_passed) {
        record.best_passed = passed;
        record.best_total = total;
    }

    // Already solved: nothing to award, regardless of the new result
    if prior.all_passed {
        return ScoreOutcome { points_delta: 0, solved_delta: 0, record };
    }

    if verdict.all_passed() {
        record.all_passed = true;
        record.points_awarded = challenge.points;
        record.first_full_pass_at_ms = Some(elapsed_ms);
        ScoreOutcome {
            points_delta: challenge.points,
            solved_delta: 1,
            record,
        }
    } else {
        ScoreOutcome { points_delta: 0, solved_delta: 0, record }
    }
}
