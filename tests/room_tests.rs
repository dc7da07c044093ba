//! Contest room integration tests
//!
//! These drive a real room task through its command queue with a scripted
//! judge and the in-memory contest store, covering the engine's observable
//! guarantees: monotonic scores, at-most-one award per challenge, ordering
//! under out-of-order judge responses, expiry enforcement and reconnects.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};
use uuid::Uuid;

use codearena::error::AppResult;
use codearena::judge::{JudgeClient, JudgeRequest, JudgeVerdict, TestResult};
use codearena::models::{Challenge, Contest, ContestStatus, TestCase};
use codearena::protocol::ServerMessage;
use codearena::room::RoomRegistry;
use codearena::store::{ContestStore, MemoryContestStore};

const HOST_KEY: &str = "host-secret";

// -- scripted judge ----------------------------------------------------------

/// What the judge should answer for one call, after an optional delay
#[derive(Clone, Copy)]
enum Script {
    PassAll,
    PassCount(u32),
    Timeout,
}

struct ScriptedJudge {
    /// Consumed in call order; used when no keyed entry matches
    ordered: Mutex<VecDeque<(u64, Script)>>,
    /// Matched against the submitted code, for tests with concurrent calls
    keyed: HashMap<String, (u64, Script)>,
}

impl ScriptedJudge {
    fn new(script: Vec<(u64, Script)>) -> Arc<Self> {
        Arc::new(Self {
            ordered: Mutex::new(script.into()),
            keyed: HashMap::new(),
        })
    }

    fn keyed(entries: &[(&str, u64, Script)]) -> Arc<Self> {
        Arc::new(Self {
            ordered: Mutex::new(VecDeque::new()),
            keyed: entries
                .iter()
                .map(|(code, delay, script)| (code.to_string(), (*delay, *script)))
                .collect(),
        })
    }
}

#[async_trait]
impl JudgeClient for ScriptedJudge {
    async fn judge(&self, request: &JudgeRequest) -> AppResult<JudgeVerdict> {
        let (delay_ms, script) = match self.keyed.get(&request.code) {
            Some(entry) => *entry,
            None => self
                .ordered
                .lock()
                .await
                .pop_front()
                .unwrap_or((0, Script::PassAll)),
        };

        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }

        let total = request.test_cases.len() as u32;
        let passed = match script {
            Script::PassAll => total,
            Script::PassCount(n) => n.min(total),
            Script::Timeout => {
                return Ok(JudgeVerdict::synthetic_failure(&request.test_cases, true));
            }
        };

        Ok(JudgeVerdict {
            results: request
                .test_cases
                .iter()
                .enumerate()
                .map(|(i, t)| TestResult {
                    passed: (i as u32) < passed,
                    actual: t.expected_output.clone(),
                    expected: t.expected_output.clone(),
                    runtime_ms: 1,
                    hidden: t.hidden,
                })
                .collect(),
            compile_error: None,
            timed_out: false,
        })
    }
}

// -- fixtures ----------------------------------------------------------------

fn challenge(title: &str, points: u32, visible: usize, hidden: usize) -> Challenge {
    let mut test_cases: Vec<TestCase> = (0..visible)
        .map(|i| TestCase {
            input: format!("in{i}"),
            expected_output: format!("out{i}"),
            hidden: false,
        })
        .collect();
    test_cases.extend((0..hidden).map(|i| TestCase {
        input: format!("hin{i}"),
        expected_output: format!("hout{i}"),
        hidden: true,
    }));

    Challenge {
        id: Uuid::new_v4(),
        title: title.to_string(),
        description: "solve it".to_string(),
        difficulty: "medium".to_string(),
        points,
        test_cases,
        starter_code: HashMap::new(),
        examples: vec![],
        constraints: vec![],
        hints: vec![],
    }
}

fn contest(status: ContestStatus, duration_secs: u64) -> Contest {
    Contest {
        id: Uuid::new_v4(),
        join_code: "ARENA1".to_string(),
        title: "Weekly Sprint".to_string(),
        topic: "arrays".to_string(),
        difficulty: "medium".to_string(),
        host_name: "Dana".to_string(),
        host_key: HOST_KEY.to_string(),
        duration_secs,
        status,
        started_at: None,
        ends_at: None,
        challenges: vec![
            challenge("Two Sum", 100, 8, 2),
            challenge("Interval Merge", 150, 3, 2),
        ],
    }
}

async fn setup(
    contest: Contest,
    script: Vec<(u64, Script)>,
) -> (Arc<MemoryContestStore>, Arc<RoomRegistry>) {
    setup_with_judge(contest, ScriptedJudge::new(script)).await
}

async fn setup_with_judge(
    contest: Contest,
    judge: Arc<ScriptedJudge>,
) -> (Arc<MemoryContestStore>, Arc<RoomRegistry>) {
    let store = Arc::new(MemoryContestStore::new());
    store.insert(contest).await;
    // Heartbeat and idle reaping kept long so neither interleaves with assertions
    let registry = RoomRegistry::new(judge, store.clone(), 60_000, 2_000, 60_000);
    (store, registry)
}

type Rx = mpsc::UnboundedReceiver<ServerMessage>;

async fn join(
    registry: &Arc<RoomRegistry>,
    name: &str,
    participant_id: Option<Uuid>,
    host_key: Option<&str>,
) -> (Uuid, Rx) {
    let room = registry.get_or_load("ARENA1").await.expect("room loads");
    let (tx, rx) = mpsc::unbounded_channel();
    let id = room
        .join(name.to_string(), participant_id, host_key.map(String::from), tx)
        .await
        .expect("join succeeds");
    (id, rx)
}

async fn room(registry: &Arc<RoomRegistry>) -> codearena::room::RoomHandle {
    registry.get_or_load("ARENA1").await.expect("room available")
}

/// Wait for the next message matching `pred`, skipping everything else
async fn wait_for(rx: &mut Rx, pred: impl Fn(&ServerMessage) -> bool) -> ServerMessage {
    tokio::time::timeout(Duration::from_secs(3), async {
        loop {
            let message = rx.recv().await.expect("channel open");
            if pred(&message) {
                return message;
            }
        }
    })
    .await
    .expect("expected message before timeout")
}

async fn expect_submission_result(rx: &mut Rx) -> (u32, u32, u32, u32, bool) {
    let message = wait_for(rx, |m| matches!(m, ServerMessage::SubmissionResult { .. })).await;
    match message {
        ServerMessage::SubmissionResult {
            points_earned,
            total_score,
            solved_count,
            rank,
            all_passed,
            ..
        } => (points_earned, total_score, solved_count, rank, all_passed),
        _ => unreachable!(),
    }
}

async fn expect_error_code(rx: &mut Rx, expected: &str) {
    let message = wait_for(rx, |m| matches!(m, ServerMessage::Error { .. })).await;
    match message {
        ServerMessage::Error { code, .. } => assert_eq!(code, expected),
        _ => unreachable!(),
    }
}

fn submit(participant_id: Uuid, challenge_index: usize) -> codearena::room::Command {
    submit_code(participant_id, challenge_index, "def solve(): pass")
}

fn submit_code(
    participant_id: Uuid,
    challenge_index: usize,
    code: &str,
) -> codearena::room::Command {
    codearena::room::Command::SubmitCode {
        participant_id,
        challenge_index,
        code: code.to_string(),
        language: "python".to_string(),
        client_time_ms: 0,
    }
}

// -- tests -------------------------------------------------------------------

#[tokio::test]
async fn full_pass_awards_full_points_once() {
    let (_, registry) = setup(
        contest(ContestStatus::Waiting, 3600),
        vec![(0, Script::PassAll), (0, Script::PassCount(6)), (0, Script::PassAll)],
    )
    .await;
    let room = room(&registry).await;

    let (host_id, _host_rx) = join(&registry, "Dana", None, Some(HOST_KEY)).await;
    let (a_id, mut a_rx) = join(&registry, "Alice", None, None).await;
    room.send(codearena::room::Command::Start { participant_id: host_id }).unwrap();
    wait_for(&mut a_rx, |m| matches!(m, ServerMessage::Started { .. })).await;

    // First full pass: full value, no partial credit accounting
    room.send(submit(a_id, 0)).unwrap();
    let (points, score, solved, rank, all_passed) = expect_submission_result(&mut a_rx).await;
    assert_eq!((points, score, solved, rank), (100, 100, 1, 1));
    assert!(all_passed);

    // Worse resubmission never lowers anything
    room.send(submit(a_id, 0)).unwrap();
    let (points, score, solved, _, all_passed) = expect_submission_result(&mut a_rx).await;
    assert_eq!((points, score, solved), (0, 100, 1));
    assert!(all_passed);

    // A better-looking resubmission of a solved challenge still awards nothing
    room.send(submit(a_id, 0)).unwrap();
    let (points, score, _, _, _) = expect_submission_result(&mut a_rx).await;
    assert_eq!((points, score), (0, 100));
}

#[tokio::test]
async fn leaderboard_updates_on_score_change() {
    let (_, registry) = setup(
        contest(ContestStatus::Waiting, 3600),
        vec![(0, Script::PassAll), (0, Script::PassAll)],
    )
    .await;
    let room = room(&registry).await;

    let (host_id, _host_rx) = join(&registry, "Dana", None, Some(HOST_KEY)).await;
    let (a_id, mut a_rx) = join(&registry, "Alice", None, None).await;
    let (b_id, mut b_rx) = join(&registry, "Bob", None, None).await;
    room.send(codearena::room::Command::Start { participant_id: host_id }).unwrap();
    wait_for(&mut a_rx, |m| matches!(m, ServerMessage::Started { .. })).await;

    // Alice solves the 100-pointer, Bob the 150-pointer
    room.send(submit(a_id, 0)).unwrap();
    expect_submission_result(&mut a_rx).await;
    room.send(submit(b_id, 1)).unwrap();
    let (_, _, _, rank_b, _) = expect_submission_result(&mut b_rx).await;
    assert_eq!(rank_b, 1);

    // The broadcast leaderboard ranks Bob (150) above Alice (100)
    let message = wait_for(&mut a_rx, |m| {
        matches!(m, ServerMessage::LeaderboardLive { leaderboard }
            if leaderboard.first().is_some_and(|top| top.score == 150))
    })
    .await;
    match message {
        ServerMessage::LeaderboardLive { leaderboard } => {
            assert_eq!(leaderboard[0].name, "Bob");
            assert_eq!(leaderboard[0].score, 150);
            assert_eq!(leaderboard[0].rank, 1);
            assert_eq!(leaderboard[1].name, "Alice");
            assert_eq!(leaderboard[1].score, 100);
            assert_eq!(leaderboard[1].rank, 2);
        }
        _ => unreachable!(),
    }

    // Final standings keep the same order
    room.send(codearena::room::Command::End { participant_id: host_id }).unwrap();
    let ended = wait_for(&mut b_rx, |m| matches!(m, ServerMessage::Ended { .. })).await;
    match ended {
        ServerMessage::Ended { leaderboard, stats } => {
            assert_eq!(leaderboard[0].name, "Bob");
            assert_eq!(leaderboard[1].name, "Alice");
            assert_eq!(stats.participant_count, 2);
            assert_eq!(stats.total_submissions, 2);
            assert_eq!(stats.fully_solved, 2);
        }
        _ => unreachable!(),
    }
}

#[tokio::test]
async fn stale_judge_result_is_discarded() {
    // First submission judged slowly and partially; second judged instantly
    // and fully. The slow earlier result must not overwrite the later one.
    let judge = ScriptedJudge::keyed(&[
        ("slow partial", 300, Script::PassCount(3)),
        ("fast full", 0, Script::PassAll),
    ]);
    let (_, registry) = setup_with_judge(contest(ContestStatus::Waiting, 3600), judge).await;
    let room = room(&registry).await;

    let (host_id, _host_rx) = join(&registry, "Dana", None, Some(HOST_KEY)).await;
    let (a_id, mut a_rx) = join(&registry, "Alice", None, None).await;
    room.send(codearena::room::Command::Start { participant_id: host_id }).unwrap();
    wait_for(&mut a_rx, |m| matches!(m, ServerMessage::Started { .. })).await;

    room.send(submit_code(a_id, 0, "slow partial")).unwrap();
    room.send(submit_code(a_id, 0, "fast full")).unwrap();

    // Only the later (full) submission is applied
    let (points, score, _, _, all_passed) = expect_submission_result(&mut a_rx).await;
    assert_eq!((points, score), (100, 100));
    assert!(all_passed);

    // The stale partial result is dropped entirely, not delivered late
    tokio::time::sleep(Duration::from_millis(500)).await;
    let mut extra_results = 0;
    while let Ok(message) = a_rx.try_recv() {
        if matches!(message, ServerMessage::SubmissionResult { .. }) {
            extra_results += 1;
        }
    }
    assert_eq!(extra_results, 0);

    // State still reflects the applied full pass
    let (_, mut rejoin_rx) = join(&registry, "Alice", Some(a_id), None).await;
    let snapshot = wait_for(&mut rejoin_rx, |m| matches!(m, ServerMessage::Joined(_))).await;
    match snapshot {
        ServerMessage::Joined(payload) => {
            assert_eq!(payload.score, 100);
            assert_eq!(payload.solved_indices, vec![0]);
        }
        _ => unreachable!(),
    }
}

#[tokio::test]
async fn reconnect_restores_identical_state() {
    let (_, registry) = setup(
        contest(ContestStatus::Waiting, 3600),
        vec![(0, Script::PassAll), (0, Script::PassCount(1))],
    )
    .await;
    let room = room(&registry).await;

    let (host_id, _host_rx) = join(&registry, "Dana", None, Some(HOST_KEY)).await;
    let (a_id, mut a_rx) = join(&registry, "Alice", None, None).await;
    room.send(codearena::room::Command::Start { participant_id: host_id }).unwrap();
    wait_for(&mut a_rx, |m| matches!(m, ServerMessage::Started { .. })).await;

    room.send(submit(a_id, 0)).unwrap();
    expect_submission_result(&mut a_rx).await;
    room.send(submit(a_id, 1)).unwrap();
    expect_submission_result(&mut a_rx).await;

    // Disconnect, then rejoin with the same participant id
    room.send(codearena::room::Command::Leave { participant_id: a_id }).unwrap();
    drop(a_rx);

    let (rejoined_id, mut rejoin_rx) = join(&registry, "Alice", Some(a_id), None).await;
    assert_eq!(rejoined_id, a_id);

    let snapshot = wait_for(&mut rejoin_rx, |m| matches!(m, ServerMessage::Joined(_))).await;
    match snapshot {
        ServerMessage::Joined(payload) => {
            assert_eq!(payload.score, 100);
            assert_eq!(payload.solved_count, 1);
            assert_eq!(payload.submitted_indices, vec![0, 1]);
            assert_eq!(payload.solved_indices, vec![0]);
            assert!(payload.challenges.is_some());
            assert!(payload.remaining_ms.unwrap() > 0);
        }
        _ => unreachable!(),
    }
}

#[tokio::test]
async fn submissions_after_expiry_are_rejected() {
    // Zero-duration contest: ends_at equals started_at
    let (_, registry) = setup(contest(ContestStatus::Waiting, 0), vec![]).await;
    let room = room(&registry).await;

    let (host_id, mut host_rx) = join(&registry, "Dana", None, Some(HOST_KEY)).await;
    let (a_id, mut a_rx) = join(&registry, "Alice", None, None).await;
    room.send(codearena::room::Command::Start { participant_id: host_id }).unwrap();

    // Past ends_at: rejected regardless of whether completion has fired yet
    room.send(submit(a_id, 1)).unwrap();
    expect_error_code(&mut a_rx, "contest_ended").await;

    // The room's own timer drives the completion broadcast
    wait_for(&mut host_rx, |m| matches!(m, ServerMessage::Ended { .. })).await;
}

#[tokio::test]
async fn host_end_flushes_final_state_and_is_idempotent() {
    let (store, registry) = setup(
        contest(ContestStatus::Waiting, 3600),
        vec![(0, Script::PassAll)],
    )
    .await;
    let contest_id = store.load("ARENA1").await.unwrap().unwrap().id;
    let room = room(&registry).await;

    let (host_id, mut host_rx) = join(&registry, "Dana", None, Some(HOST_KEY)).await;
    let (a_id, mut a_rx) = join(&registry, "Alice", None, None).await;
    room.send(codearena::room::Command::Start { participant_id: host_id }).unwrap();
    wait_for(&mut a_rx, |m| matches!(m, ServerMessage::Started { .. })).await;

    room.send(submit(a_id, 0)).unwrap();
    expect_submission_result(&mut a_rx).await;

    room.send(codearena::room::Command::End { participant_id: host_id }).unwrap();
    let ended = wait_for(&mut host_rx, |m| matches!(m, ServerMessage::Ended { .. })).await;
    match ended {
        ServerMessage::Ended { leaderboard, stats } => {
            assert_eq!(leaderboard.len(), 1);
            assert_eq!(leaderboard[0].score, 100);
            assert_eq!(stats.participant_count, 1);
            assert_eq!(stats.total_submissions, 1);
            assert_eq!(stats.fully_solved, 1);
        }
        _ => unreachable!(),
    }

    // Second end is a no-op: no second Ended broadcast
    room.send(codearena::room::Command::End { participant_id: host_id }).unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    while let Ok(message) = host_rx.try_recv() {
        assert!(!matches!(message, ServerMessage::Ended { .. }));
    }

    // Late submissions answer contest_ended and change nothing
    room.send(submit(a_id, 1)).unwrap();
    expect_error_code(&mut a_rx, "contest_ended").await;

    // Final state reached the store
    let mut flushed = None;
    for _ in 0..50 {
        flushed = store.final_record(contest_id).await;
        if flushed.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let flushed = flushed.expect("final state flushed");
    assert_eq!(flushed.contest.status, ContestStatus::Completed);
    assert_eq!(flushed.leaderboard.len(), 1);
    assert_eq!(flushed.leaderboard[0].score, 100);

    // Audit trail captured the scored submission
    let mut audits = 0;
    for _ in 0..50 {
        audits = store.submission_count().await;
        if audits == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(audits, 1);
}

#[tokio::test]
async fn draft_contest_requires_publish_before_join() {
    let (_, registry) = setup(contest(ContestStatus::Draft, 3600), vec![]).await;

    // Participants cannot join a draft contest
    let room = registry.get_or_load("ARENA1").await.unwrap();
    let (tx, _rx) = mpsc::unbounded_channel();
    let denied = room.join("Alice".to_string(), None, None, tx).await;
    assert!(denied.is_err());

    // The host can, and publishing opens the lobby
    let (host_id, _host_rx) = join(&registry, "Dana", None, Some(HOST_KEY)).await;
    room.send(codearena::room::Command::Publish { participant_id: host_id }).unwrap();
    // Publish is processed before the next join on the same queue
    let (_, mut a_rx) = join(&registry, "Alice", None, None).await;
    let snapshot = wait_for(&mut a_rx, |m| matches!(m, ServerMessage::Joined(_))).await;
    match snapshot {
        ServerMessage::Joined(payload) => assert_eq!(payload.status, ContestStatus::Waiting),
        _ => unreachable!(),
    }
}

#[tokio::test]
async fn non_host_cannot_drive_lifecycle() {
    let (_, registry) = setup(contest(ContestStatus::Waiting, 3600), vec![]).await;
    let room = room(&registry).await;

    let (a_id, mut a_rx) = join(&registry, "Alice", None, None).await;
    room.send(codearena::room::Command::Start { participant_id: a_id }).unwrap();
    expect_error_code(&mut a_rx, "not_host").await;

    // Submissions before start are refused too
    room.send(submit(a_id, 0)).unwrap();
    expect_error_code(&mut a_rx, "invalid_transition").await;
}

#[tokio::test]
async fn unknown_contest_code_is_rejected() {
    let store = Arc::new(MemoryContestStore::new());
    let judge = ScriptedJudge::new(vec![]);
    let registry = RoomRegistry::new(judge, store, 60_000, 2_000, 60_000);

    let result = registry.get_or_load("NOPE42").await;
    assert!(matches!(result, Err(codearena::AppError::UnknownContest(_))));
}

#[tokio::test]
async fn idle_lobby_room_is_reaped() {
    let store = Arc::new(MemoryContestStore::new());
    store.insert(contest(ContestStatus::Waiting, 3600)).await;
    let judge = ScriptedJudge::new(vec![]);
    let registry = RoomRegistry::new(judge, store, 60_000, 2_000, 150);

    let (a_id, _a_rx) = join(&registry, "Alice", None, None).await;
    assert_eq!(registry.len(), 1);

    let room = room(&registry).await;
    room.send(codearena::room::Command::Leave { participant_id: a_id }).unwrap();

    // Nobody is connected; once the idle period elapses the room is gone
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(registry.len(), 0);

    // The stored contest is untouched and a later join respawns the room
    let (_, mut rx) = join(&registry, "Bob", None, None).await;
    let snapshot = wait_for(&mut rx, |m| matches!(m, ServerMessage::Joined(_))).await;
    match snapshot {
        ServerMessage::Joined(payload) => assert_eq!(payload.status, ContestStatus::Waiting),
        _ => unreachable!(),
    }
    assert_eq!(registry.len(), 1);
}

#[tokio::test]
async fn judge_timeout_surfaces_as_failed_submission() {
    let (_, registry) = setup(
        contest(ContestStatus::Waiting, 3600),
        vec![(0, Script::Timeout), (0, Script::PassAll)],
    )
    .await;
    let room = room(&registry).await;

    let (host_id, _host_rx) = join(&registry, "Dana", None, Some(HOST_KEY)).await;
    let (a_id, mut a_rx) = join(&registry, "Alice", None, None).await;
    room.send(codearena::room::Command::Start { participant_id: host_id }).unwrap();
    wait_for(&mut a_rx, |m| matches!(m, ServerMessage::Started { .. })).await;

    // Timed-out call: all tests reported failed, no points, no retry
    room.send(submit(a_id, 0)).unwrap();
    let (points, score, _, _, all_passed) = expect_submission_result(&mut a_rx).await;
    assert_eq!((points, score), (0, 0));
    assert!(!all_passed);

    // The participant may simply resubmit
    room.send(submit(a_id, 0)).unwrap();
    let (points, score, _, _, _) = expect_submission_result(&mut a_rx).await;
    assert_eq!((points, score), (100, 100));
}
