//! Contest and challenge models

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single test case of a challenge.
///
/// Hidden test cases are withheld from participants and only exercised when a
/// submission is scored; visible test cases are also used by `run-code`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    pub input: String,
    pub expected_output: String,
    #[serde(default)]
    pub hidden: bool,
}

/// A challenge attached to a contest. Immutable once the contest is active.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Challenge {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub difficulty: String,
    /// Points awarded in full on the first fully-passing submission
    pub points: u32,
    /// Ordered test cases (visible and hidden)
    pub test_cases: Vec<TestCase>,
    /// Starter code keyed by language
    #[serde(default)]
    pub starter_code: HashMap<String, String>,
    #[serde(default)]
    pub examples: Vec<String>,
    #[serde(default)]
    pub constraints: Vec<String>,
    #[serde(default)]
    pub hints: Vec<String>,
}

impl Challenge {
    /// Test cases shown to participants before submission
    pub fn visible_test_cases(&self) -> Vec<TestCase> {
        self.test_cases.iter().filter(|t| !t.hidden).cloned().collect()
    }
}

/// Contest lifecycle status. Transitions are monotonic:
/// draft -> waiting -> active -> completed, never backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContestStatus {
    Draft,
    Waiting,
    Active,
    Completed,
}

impl std::fmt::Display for ContestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Draft => write!(f, "draft"),
            Self::Waiting => write!(f, "waiting"),
            Self::Active => write!(f, "active"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// A contest as loaded from the contest store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contest {
    pub id: Uuid,
    /// Short code participants use to join
    pub join_code: String,
    pub title: String,
    pub topic: String,
    pub difficulty: String,
    pub host_name: String,
    /// Secret presented at join time to act as host
    pub host_key: String,
    /// Contest duration in seconds, fixed at creation
    pub duration_secs: u64,
    pub status: ContestStatus,
    /// Set exactly once, at activation
    pub started_at: Option<DateTime<Utc>>,
    /// Set exactly once, at activation; authoritative end time
    pub ends_at: Option<DateTime<Utc>>,
    pub challenges: Vec<Challenge>,
}

impl Contest {
    /// Milliseconds remaining until `ends_at`, clamped at zero.
    /// Only meaningful while status is active or completed.
    pub fn remaining_ms(&self, now: DateTime<Utc>) -> u64 {
        match self.ends_at {
            Some(ends_at) if ends_at > now => (ends_at - now).num_milliseconds() as u64,
            _ => 0,
        }
    }

    /// Whether the authoritative end time has passed
    pub fn past_end(&self, now: DateTime<Utc>) -> bool {
        matches!(self.ends_at, Some(ends_at) if now >= ends_at)
    }
}
