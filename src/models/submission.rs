//! Submission audit record
//!
//! Submissions are transient: a room scores them and forwards this record to
//! the contest store as an audit trail. Nothing else retains them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Audit row describing one scored submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionAudit {
    pub contest_id: Uuid,
    pub participant_id: Uuid,
    pub challenge_index: usize,
    pub language: String,
    pub code: String,
    pub submitted_at: DateTime<Utc>,
    pub passed: u32,
    pub total: u32,
    pub points_earned: u32,
    pub timed_out: bool,
}
