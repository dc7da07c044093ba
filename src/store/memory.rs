//! In-memory contest store, used by tests and local development

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::AppResult;
use crate::leaderboard::LeaderboardEntry;
use crate::models::{Contest, Participant, SubmissionAudit};

use super::ContestStore;

/// Final state captured by [`MemoryContestStore::persist_final`]
#[derive(Debug, Clone)]
pub struct FinalRecord {
    pub contest: Contest,
    pub participants: Vec<Participant>,
    pub leaderboard: Vec<LeaderboardEntry>,
}

#[derive(Default)]
struct Inner {
    contests: HashMap<String, Contest>,
    finals: HashMap<Uuid, FinalRecord>,
    submissions: Vec<SubmissionAudit>,
}

/// Contest store backed by process memory
#[derive(Default)]
pub struct MemoryContestStore {
    inner: RwLock<Inner>,
}

impl MemoryContestStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a contest, keyed by its join code
    pub async fn insert(&self, contest: Contest) {
        let mut inner = self.inner.write().await;
        inner.contests.insert(contest.join_code.clone(), contest);
    }

    /// Final record flushed for a contest, if any
    pub async fn final_record(&self, contest_id: Uuid) -> Option<FinalRecord> {
        self.inner.read().await.finals.get(&contest_id).cloned()
    }

    /// Number of audit rows appended
    pub async fn submission_count(&self) -> usize {
        self.inner.read().await.submissions.len()
    }
}

#[async_trait]
impl ContestStore for MemoryContestStore {
    async fn load(&self, join_code: &str) -> AppResult<Option<Contest>> {
        Ok(self.inner.read().await.contests.get(join_code).cloned())
    }

    async fn persist_final(
        &self,
        contest: &Contest,
        participants: &[Participant],
        leaderboard: &[LeaderboardEntry],
    ) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        inner.contests.insert(contest.join_code.clone(), contest.clone());
        inner.finals.insert(
            contest.id,
            FinalRecord {
                contest: contest.clone(),
                participants: participants.to_vec(),
                leaderboard: leaderboard.to_vec(),
            },
        );
        Ok(())
    }

    async fn append_submission(&self, audit: &SubmissionAudit) -> AppResult<()> {
        self.inner.write().await.submissions.push(audit.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ContestStatus;
    use tokio_test::assert_ok;

    fn contest(code: &str) -> Contest {
        Contest {
            id: Uuid::new_v4(),
            join_code: code.to_string(),
            title: "t".to_string(),
            topic: "t".to_string(),
            difficulty: "easy".to_string(),
            host_name: "h".to_string(),
            host_key: "k".to_string(),
            duration_secs: 60,
            status: ContestStatus::Waiting,
            started_at: None,
            ends_at: None,
            challenges: vec![],
        }
    }

    #[tokio::test]
    async fn test_load_by_join_code() {
        let store = MemoryContestStore::new();
        store.insert(contest("AAA111")).await;

        let loaded = tokio_test::assert_ok!(store.load("AAA111").await);
        assert!(loaded.is_some());
        assert!(tokio_test::assert_ok!(store.load("ZZZ999").await).is_none());
    }

    #[tokio::test]
    async fn test_persist_final_is_idempotent() {
        let store = MemoryContestStore::new();
        let contest = contest("AAA111");
        tokio_test::assert_ok!(store.persist_final(&contest, &[], &[]).await);
        tokio_test::assert_ok!(store.persist_final(&contest, &[], &[]).await);
        assert!(store.final_record(contest.id).await.is_some());
    }
}
