//! Contest store - narrow persistence seam
//!
//! The engine reads contests and writes final results through this interface.
//! It must tolerate concurrent writes from many independent rooms.

mod memory;
mod postgres;

use async_trait::async_trait;

use crate::error::AppResult;
use crate::leaderboard::LeaderboardEntry;
use crate::models::{Contest, Participant, SubmissionAudit};

pub use memory::{FinalRecord, MemoryContestStore};
pub use postgres::PgContestStore;

/// Durable record of contests, challenges and final results
#[async_trait]
pub trait ContestStore: Send + Sync {
    /// Load a contest (with its challenges) by join code
    async fn load(&self, join_code: &str) -> AppResult<Option<Contest>>;

    /// Flush the final contest state once a room completes
    async fn persist_final(
        &self,
        contest: &Contest,
        participants: &[Participant],
        leaderboard: &[LeaderboardEntry],
    ) -> AppResult<()>;

    /// Append one scored submission to the audit trail
    async fn append_submission(&self, audit: &SubmissionAudit) -> AppResult<()>;
}
