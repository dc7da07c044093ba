//! Realtime protocol messages
//!
//! The wire contract between clients (host and participants) and the gateway.
//! Inbound and outbound payloads form two closed tagged-variant sets, one
//! variant per protocol event; dynamic payloads are validated at the gateway
//! boundary before any command enters a room's queue.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::constants::{MAX_NAME_LENGTH, SUPPORTED_LANGUAGES};
use crate::judge::TestResult;
use crate::leaderboard::LeaderboardEntry;
use crate::models::{Challenge, Contest, ContestStatus, Participant};

// ---------------------------------------------------------------------------
// Client -> Server
// ---------------------------------------------------------------------------

/// Inbound messages, tagged by `event`
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// Enter a contest by join code; `participant_id` resumes a previous session
    Join(JoinPayload),
    /// Host: draft -> waiting
    Publish,
    /// Host: waiting -> active, fixes the end time
    Start,
    /// Host: active -> completed
    End,
    /// Judge against visible test cases only; informational
    RunCode(RunCodePayload),
    /// Scored judge request against all test cases
    SubmitCode(SubmitCodePayload),
    Ping,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct JoinPayload {
    #[validate(length(min = 4, max = 12))]
    pub code: String,
    #[validate(length(min = 1, max = MAX_NAME_LENGTH))]
    pub name: String,
    /// Reconnect key minted by the server on first join
    pub participant_id: Option<Uuid>,
    /// Presented to act as contest host
    pub host_key: Option<String>,
}

/// Validated at the gateway by [`validate_source_code`] and [`validate_language`]
#[derive(Debug, Clone, Deserialize)]
pub struct RunCodePayload {
    pub challenge_index: usize,
    pub code: String,
    pub language: String,
}

/// Validated at the gateway by [`validate_source_code`] and [`validate_language`]
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitCodePayload {
    pub challenge_index: usize,
    pub code: String,
    pub language: String,
    /// Client-side clock at submission; advisory only, audit trail
    pub client_time_ms: u64,
}

/// Validate a programming language against the sandbox's supported set
pub fn validate_language(language: &str) -> Result<(), &'static str> {
    if SUPPORTED_LANGUAGES.contains(&language) {
        Ok(())
    } else {
        Err("Unsupported programming language")
    }
}

/// Validate source code size
pub fn validate_source_code(code: &str) -> Result<(), &'static str> {
    if code.is_empty() {
        return Err("Source code cannot be empty");
    }
    if code.len() > crate::constants::MAX_CODE_BYTES {
        return Err("Source code exceeds maximum size of 64KB");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Server -> Client
// ---------------------------------------------------------------------------

/// Outbound messages, tagged by `event`
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// Initial or resumed state snapshot after a successful join
    Joined(JoinedPayload),
    /// Roster change broadcast
    ParticipantUpdate { participants: Vec<ParticipantView> },
    /// waiting -> active transition
    Started {
        challenges: Vec<ChallengeView>,
        ends_at_ms: i64,
    },
    /// Informational run outcome, no score effect
    RunResult {
        challenge_index: usize,
        results: Vec<TestResultView>,
        passed: u32,
        total: u32,
    },
    /// Per-submitter scored outcome
    SubmissionResult {
        challenge_index: usize,
        passed: u32,
        total: u32,
        points_earned: u32,
        total_score: u32,
        solved_count: u32,
        rank: u32,
        all_passed: bool,
        results: Vec<TestResultView>,
    },
    /// Pushed to the room after any score change
    LeaderboardLive { leaderboard: Vec<LeaderboardEntry> },
    /// Periodic heartbeat / countdown resync
    ProgressUpdate {
        leaderboard: Vec<LeaderboardEntry>,
        remaining_ms: u64,
    },
    /// active -> completed transition, with final standings
    Ended {
        leaderboard: Vec<LeaderboardEntry>,
        stats: ContestStats,
    },
    /// Rejected or invalid command
    Error { code: String, message: String },
    Pong,
}

/// Snapshot sent on (re)join
#[derive(Debug, Clone, Serialize)]
pub struct JoinedPayload {
    pub participant_id: Uuid,
    pub status: ContestStatus,
    pub title: String,
    pub host_name: String,
    /// Present once the contest has started
    pub challenges: Option<Vec<ChallengeView>>,
    pub ends_at_ms: Option<i64>,
    pub remaining_ms: Option<u64>,
    /// Challenge indices this participant has already submitted to
    pub submitted_indices: Vec<usize>,
    /// Challenge indices this participant has fully solved
    pub solved_indices: Vec<usize>,
    pub score: u32,
    pub solved_count: u32,
    pub participants: Vec<ParticipantView>,
}

/// Public roster entry
#[derive(Debug, Clone, Serialize)]
pub struct ParticipantView {
    pub participant_id: Uuid,
    pub name: String,
    pub score: u32,
    pub solved_count: u32,
}

impl ParticipantView {
    pub fn from_participant(p: &Participant) -> Self {
        Self {
            participant_id: p.id,
            name: p.name.clone(),
            score: p.score,
            solved_count: p.solved_count,
        }
    }
}

/// Challenge as shown to participants: hidden test cases are withheld
#[derive(Debug, Clone, Serialize)]
pub struct ChallengeView {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub difficulty: String,
    pub points: u32,
    pub visible_test_cases: Vec<TestCaseView>,
    pub starter_code: HashMap<String, String>,
    pub examples: Vec<String>,
    pub constraints: Vec<String>,
    pub hints: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TestCaseView {
    pub input: String,
    pub expected_output: String,
}

impl ChallengeView {
    pub fn from_challenge(challenge: &Challenge) -> Self {
        Self {
            id: challenge.id,
            title: challenge.title.clone(),
            description: challenge.description.clone(),
            difficulty: challenge.difficulty.clone(),
            points: challenge.points,
            visible_test_cases: challenge
                .visible_test_cases()
                .into_iter()
                .map(|t| TestCaseView {
                    input: t.input,
                    expected_output: t.expected_output,
                })
                .collect(),
            starter_code: challenge.starter_code.clone(),
            examples: challenge.examples.clone(),
            constraints: challenge.constraints.clone(),
            hints: challenge.hints.clone(),
        }
    }

    pub fn all(contest: &Contest) -> Vec<Self> {
        contest.challenges.iter().map(Self::from_challenge).collect()
    }
}

/// Judged test case as shown to the submitter. Hidden test cases report only
/// pass/fail; their inputs and outputs stay withheld.
#[derive(Debug, Clone, Serialize)]
pub struct TestResultView {
    pub passed: bool,
    pub actual: Option<String>,
    pub expected: Option<String>,
    pub runtime_ms: u64,
    pub hidden: bool,
}

impl TestResultView {
    pub fn from_result(result: &TestResult) -> Self {
        if result.hidden {
            Self {
                passed: result.passed,
                actual: None,
                expected: None,
                runtime_ms: result.runtime_ms,
                hidden: true,
            }
        } else {
            Self {
                passed: result.passed,
                actual: Some(result.actual.clone()),
                expected: Some(result.expected.clone()),
                runtime_ms: result.runtime_ms,
                hidden: false,
            }
        }
    }
}

/// Final contest statistics broadcast with `ended`
#[derive(Debug, Clone, Serialize)]
pub struct ContestStats {
    pub participant_count: u32,
    pub total_submissions: u32,
    pub fully_solved: u32,
    pub duration_ms: u64,
}
