//! Room registry
//!
//! Maps join codes to live room handles. The first join for a contest loads it
//! from the store and spawns its room; a completed room removes itself, after
//! which the code resolves to nothing (the contest is over in the store too).

use std::sync::Arc;

use dashmap::DashMap;

use crate::error::{AppError, AppResult};
use crate::judge::JudgeClient;
use crate::models::ContestStatus;
use crate::store::ContestStore;

use super::{RoomDeps, RoomHandle};

pub struct RoomRegistry {
    rooms: DashMap<String, RoomHandle>,
    judge: Arc<dyn JudgeClient>,
    store: Arc<dyn ContestStore>,
    heartbeat_interval_ms: u64,
    per_test_timeout_ms: u64,
    room_idle_timeout_ms: u64,
}

impl RoomRegistry {
    pub fn new(
        judge: Arc<dyn JudgeClient>,
        store: Arc<dyn ContestStore>,
        heartbeat_interval_ms: u64,
        per_test_timeout_ms: u64,
        room_idle_timeout_ms: u64,
    ) -> Arc<Self> {
        Arc::new(Self {
            rooms: DashMap::new(),
            judge,
            store,
            heartbeat_interval_ms,
            per_test_timeout_ms,
            room_idle_timeout_ms,
        })
    }

    /// Resolve a join code to a live room, loading and spawning it on first use
    pub async fn get_or_load(self: &Arc<Self>, join_code: &str) -> AppResult<RoomHandle> {
        if let Some(handle) = self.rooms.get(join_code) {
            return Ok(handle.clone());
        }

        let contest = self
            .store
            .load(join_code)
            .await?
            .ok_or_else(|| AppError::UnknownContest(join_code.to_string()))?;

        if contest.status == ContestStatus::Completed {
            return Err(AppError::ContestEnded);
        }

        let deps = RoomDeps {
            judge: self.judge.clone(),
            store: self.store.clone(),
            registry: self.clone(),
            heartbeat_interval_ms: self.heartbeat_interval_ms,
            per_test_timeout_ms: self.per_test_timeout_ms,
            room_idle_timeout_ms: self.room_idle_timeout_ms,
        };

        // Two concurrent first joins may both load; only one room wins
        let handle = self
            .rooms
            .entry(join_code.to_string())
            .or_insert_with(|| RoomHandle::spawn(contest, deps))
            .clone();

        Ok(handle)
    }

    /// Drop a completed room's handle; called by the room at teardown
    pub(crate) fn remove(&self, join_code: &str) {
        self.rooms.remove(join_code);
    }

    /// Number of live rooms
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}
