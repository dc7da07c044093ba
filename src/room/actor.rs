//! The contest room state machine
//!
//! Sole mutator of its contest's state. Commands execute strictly one at a
//! time in arrival order; judge calls are dispatched as independent tasks and
//! their results re-enter the queue, so nothing ever blocks command
//! processing and no two mutations can interleave.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::judge::{JudgeRequest, JudgeVerdict};
use crate::leaderboard::{self, LeaderboardEntry};
use crate::models::{Contest, ContestStatus, Participant, SubmissionAudit, TestCase};
use crate::protocol::{
    ChallengeView, ContestStats, JoinedPayload, ParticipantView, ServerMessage, TestResultView,
};
use crate::scoring;

use super::command::{Command, OutboundTx};
use super::RoomDeps;

pub(crate) struct ContestRoom {
    contest: Contest,
    deps: RoomDeps,
    /// Weak so the room itself never keeps its own queue open
    self_tx: mpsc::WeakUnboundedSender<Command>,
    participants: HashMap<Uuid, Participant>,
    /// Live connections; comes and goes independently of participant records
    conns: HashMap<Uuid, OutboundTx>,
    /// Connections that presented the host key
    hosts: HashSet<Uuid>,
    join_counter: u32,
    /// Sequence tokens issued per (participant, challenge) judge dispatch
    issued_seq: HashMap<(Uuid, usize), u64>,
    /// Highest sequence token already applied per (participant, challenge)
    applied_seq: HashMap<(Uuid, usize), u64>,
    total_submissions: u32,
    timers_started: bool,
}

impl ContestRoom {
    pub(crate) fn new(
        contest: Contest,
        deps: RoomDeps,
        tx: mpsc::UnboundedSender<Command>,
    ) -> Self {
        Self {
            contest,
            deps,
            self_tx: tx.downgrade(),
            participants: HashMap::new(),
            conns: HashMap::new(),
            hosts: HashSet::new(),
            join_counter: 0,
            issued_seq: HashMap::new(),
            applied_seq: HashMap::new(),
            total_submissions: 0,
            timers_started: false,
        }
    }

    /// Consume commands until every handle to this room is gone
    pub(crate) async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        tracing::info!(
            contest = %self.contest.join_code,
            status = %self.contest.status,
            "contest room started"
        );

        // A contest loaded mid-flight (already active) re-arms its timers
        if self.contest.status == ContestStatus::Active {
            self.spawn_timers();
        }

        // Rooms spawn with no connections; reap if nobody ever joins
        self.arm_idle_timer();

        while let Some(command) = rx.recv().await {
            self.handle(command).await;
        }

        tracing::info!(contest = %self.contest.join_code, "contest room stopped");
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::Join { name, participant_id, host_key, tx, reply } => {
                let result = self.handle_join(name, participant_id, host_key, tx);
                let _ = reply.send(result);
            }
            Command::Leave { participant_id } => self.handle_leave(participant_id),
            Command::Publish { participant_id } => self.handle_publish(participant_id),
            Command::Start { participant_id } => self.handle_start(participant_id),
            Command::End { participant_id } => self.handle_end(participant_id).await,
            Command::RunCode { participant_id, challenge_index, code, language } => {
                self.handle_run_code(participant_id, challenge_index, code, language)
            }
            Command::SubmitCode { participant_id, challenge_index, code, language, client_time_ms } => {
                self.handle_submit_code(participant_id, challenge_index, code, language, client_time_ms)
            }
            Command::RunJudged { participant_id, challenge_index, verdict } => {
                self.handle_run_judged(participant_id, challenge_index, verdict)
            }
            Command::SubmitJudged { participant_id, challenge_index, seq, elapsed_ms, code, language, verdict } => {
                self.handle_submit_judged(participant_id, challenge_index, seq, elapsed_ms, code, language, verdict)
            }
            Command::Tick => self.handle_tick().await,
            Command::IdleCheck => self.handle_idle_check(),
            Command::TimerExpired => {
                if self.contest.status == ContestStatus::Active {
                    self.complete().await;
                }
            }
        }
    }

    // -- lifecycle ----------------------------------------------------------

    fn handle_join(
        &mut self,
        name: String,
        participant_id: Option<Uuid>,
        host_key: Option<String>,
        tx: OutboundTx,
    ) -> AppResult<Uuid> {
        let now = Utc::now();
        if self.contest.status == ContestStatus::Completed || self.contest.past_end(now) {
            return Err(AppError::ContestEnded);
        }

        let is_host = host_key.as_deref() == Some(self.contest.host_key.as_str());
        if !is_host && self.contest.status == ContestStatus::Draft {
            return Err(AppError::InvalidTransition(
                "contest is not open for joining".to_string(),
            ));
        }

        let id = participant_id.unwrap_or_else(Uuid::new_v4);
        let mut roster_changed = false;

        if is_host {
            self.hosts.insert(id);
        } else if !self.participants.contains_key(&id) {
            let participant = Participant::new(id, name, self.join_counter);
            self.join_counter += 1;
            self.participants.insert(id, participant);
            roster_changed = true;
        }

        self.conns.insert(id, tx.clone());

        let snapshot = self.joined_snapshot(id, now);
        let _ = tx.send(ServerMessage::Joined(snapshot));

        if roster_changed {
            self.broadcast_roster();
        }

        tracing::debug!(
            contest = %self.contest.join_code,
            participant = %id,
            host = is_host,
            "participant joined"
        );
        Ok(id)
    }

    fn handle_leave(&mut self, participant_id: Uuid) {
        // Participant record stays for reconnect; only the connection goes
        self.conns.remove(&participant_id);
        self.hosts.remove(&participant_id);
        if self.conns.is_empty() {
            self.arm_idle_timer();
        }
    }

    fn handle_publish(&mut self, participant_id: Uuid) {
        if !self.require_host(participant_id) {
            return;
        }
        if self.contest.status != ContestStatus::Draft {
            self.send_error(
                participant_id,
                &AppError::InvalidTransition(format!(
                    "cannot publish a {} contest",
                    self.contest.status
                )),
            );
            return;
        }
        if self.contest.challenges.is_empty() {
            self.send_error(
                participant_id,
                &AppError::Validation("contest needs at least one challenge".to_string()),
            );
            return;
        }

        self.contest.status = ContestStatus::Waiting;
        tracing::info!(contest = %self.contest.join_code, "contest published");
    }

    fn handle_start(&mut self, participant_id: Uuid) {
        if !self.require_host(participant_id) {
            return;
        }
        if self.contest.status != ContestStatus::Waiting {
            self.send_error(
                participant_id,
                &AppError::InvalidTransition(format!(
                    "cannot start a {} contest",
                    self.contest.status
                )),
            );
            return;
        }

        // ends_at is fixed exactly once, here, and owned by this room
        let now = Utc::now();
        self.contest.status = ContestStatus::Active;
        self.contest.started_at = Some(now);
        self.contest.ends_at =
            Some(now + chrono::Duration::seconds(self.contest.duration_secs as i64));

        self.broadcast(ServerMessage::Started {
            challenges: ChallengeView::all(&self.contest),
            ends_at_ms: self.contest.ends_at.unwrap().timestamp_millis(),
        });
        self.spawn_timers();

        tracing::info!(
            contest = %self.contest.join_code,
            duration_secs = self.contest.duration_secs,
            "contest started"
        );
    }

    async fn handle_end(&mut self, participant_id: Uuid) {
        if !self.require_host(participant_id) {
            return;
        }
        match self.contest.status {
            ContestStatus::Active => self.complete().await,
            // Second trigger is a no-op
            ContestStatus::Completed => {}
            status => self.send_error(
                participant_id,
                &AppError::InvalidTransition(format!("cannot end a {status} contest")),
            ),
        }
    }

    /// active -> completed: broadcast final standings, flush to the store,
    /// deregister. Idempotent; in-flight judge results arriving afterwards
    /// are discarded, not applied.
    async fn complete(&mut self) {
        if self.contest.status == ContestStatus::Completed {
            return;
        }
        self.contest.status = ContestStatus::Completed;

        let leaderboard = self.leaderboard();
        let stats = self.stats();
        self.broadcast(ServerMessage::Ended {
            leaderboard: leaderboard.clone(),
            stats,
        });

        let participants: Vec<Participant> = self.participants.values().cloned().collect();
        if let Err(e) = self
            .deps
            .store
            .persist_final(&self.contest, &participants, &leaderboard)
            .await
        {
            tracing::error!(contest = %self.contest.join_code, error = %e, "failed to flush final contest state");
        }

        self.deps.registry.remove(&self.contest.join_code);
        tracing::info!(contest = %self.contest.join_code, "contest completed");
    }

    // -- judging ------------------------------------------------------------

    fn handle_run_code(
        &mut self,
        participant_id: Uuid,
        challenge_index: usize,
        code: String,
        language: String,
    ) {
        let test_cases = match self.check_submittable(participant_id, challenge_index) {
            Ok(challenge) => challenge.visible_test_cases(),
            Err(e) => {
                self.send_error(participant_id, &e);
                return;
            }
        };

        self.dispatch_judge(code, language, test_cases, move |verdict, _code, _language| {
            Command::RunJudged { participant_id, challenge_index, verdict }
        });
    }

    fn handle_submit_code(
        &mut self,
        participant_id: Uuid,
        challenge_index: usize,
        code: String,
        language: String,
        client_time_ms: u64,
    ) {
        let test_cases = match self.check_submittable(participant_id, challenge_index) {
            Ok(challenge) => challenge.test_cases.clone(),
            Err(e) => {
                self.send_error(participant_id, &e);
                return;
            }
        };

        // Sequence token: later submissions to the same challenge always win
        // over slower earlier ones, whatever order the judge answers in.
        let seq = self
            .issued_seq
            .entry((participant_id, challenge_index))
            .and_modify(|s| *s += 1)
            .or_insert(1);
        let seq = *seq;
        let elapsed_ms = self.elapsed_ms(Utc::now());

        tracing::debug!(
            contest = %self.contest.join_code,
            participant = %participant_id,
            challenge = challenge_index,
            seq,
            client_time_ms,
            "submission dispatched to judge"
        );

        self.dispatch_judge(code, language, test_cases, move |verdict, code, language| {
            Command::SubmitJudged {
                participant_id,
                challenge_index,
                seq,
                elapsed_ms,
                code,
                language,
                verdict,
            }
        });
    }

    /// Call the judge on its own task; the verdict re-enters the queue as a
    /// command. A deadline overrun or judge fault becomes a synthetic
    /// all-failed verdict, never a blocked room.
    fn dispatch_judge(
        &self,
        code: String,
        language: String,
        test_cases: Vec<TestCase>,
        into_command: impl FnOnce(JudgeVerdict, String, String) -> Command + Send + 'static,
    ) {
        let Some(tx) = self.self_tx.upgrade() else {
            return;
        };
        let judge = self.deps.judge.clone();
        let request = JudgeRequest {
            code,
            language,
            test_cases,
            per_test_timeout_ms: self.deps.per_test_timeout_ms,
        };

        tokio::spawn(async move {
            let verdict = match judge.judge(&request).await {
                Ok(verdict) => verdict,
                Err(AppError::JudgeTimeout) => {
                    tracing::warn!("judge call exceeded its deadline");
                    JudgeVerdict::synthetic_failure(&request.test_cases, true)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "judge call failed");
                    let mut verdict = JudgeVerdict::synthetic_failure(&request.test_cases, false);
                    verdict.compile_error = Some(e.to_string());
                    verdict
                }
            };
            let _ = tx.send(into_command(verdict, request.code, request.language));
        });
    }

    fn handle_run_judged(
        &mut self,
        participant_id: Uuid,
        challenge_index: usize,
        verdict: JudgeVerdict,
    ) {
        // Informational only; a completed contest discards it
        if self.contest.status == ContestStatus::Completed {
            return;
        }
        let passed = verdict.passed_count();
        let total = verdict.total_count();
        self.send_to(
            participant_id,
            ServerMessage::RunResult {
                challenge_index,
                results: verdict.results.iter().map(TestResultView::from_result).collect(),
                passed,
                total,
            },
        );
    }

    fn handle_submit_judged(
        &mut self,
        participant_id: Uuid,
        challenge_index: usize,
        seq: u64,
        elapsed_ms: u64,
        code: String,
        language: String,
        verdict: JudgeVerdict,
    ) {
        // Results for an already-completed contest are discarded, not applied
        if self.contest.status == ContestStatus::Completed {
            tracing::debug!(
                contest = %self.contest.join_code,
                participant = %participant_id,
                "discarding judge result for completed contest"
            );
            return;
        }

        // Stale token: a later-issued submission has already been applied
        let applied = self
            .applied_seq
            .get(&(participant_id, challenge_index))
            .copied()
            .unwrap_or(0);
        if seq <= applied {
            tracing::debug!(
                contest = %self.contest.join_code,
                participant = %participant_id,
                challenge = challenge_index,
                seq,
                applied,
                "discarding stale out-of-order judge result"
            );
            return;
        }
        self.applied_seq.insert((participant_id, challenge_index), seq);

        let Some(challenge) = self.contest.challenges.get(challenge_index).cloned() else {
            return;
        };
        let Some(participant) = self.participants.get_mut(&participant_id) else {
            return;
        };

        let prior = participant.records.get(&challenge_index).cloned().unwrap_or_default();
        let outcome = scoring::score_submission(&challenge, &prior, &verdict, elapsed_ms);

        participant.score += outcome.points_delta;
        participant.solved_count += outcome.solved_delta;
        participant.records.insert(challenge_index, outcome.record.clone());
        self.total_submissions += 1;

        let total_score = participant.score;
        let solved_count = participant.solved_count;

        let leaderboard = self.leaderboard();
        let rank = leaderboard::rank_of(&leaderboard, participant_id).unwrap_or(0);

        self.send_to(
            participant_id,
            ServerMessage::SubmissionResult {
                challenge_index,
                passed: verdict.passed_count(),
                total: verdict.total_count(),
                points_earned: outcome.points_delta,
                total_score,
                solved_count,
                rank,
                all_passed: outcome.record.all_passed,
                results: verdict.results.iter().map(TestResultView::from_result).collect(),
            },
        );

        if outcome.points_delta > 0 {
            self.broadcast(ServerMessage::LeaderboardLive { leaderboard });
        }

        self.append_audit(SubmissionAudit {
            contest_id: self.contest.id,
            participant_id,
            challenge_index,
            language,
            code,
            submitted_at: Utc::now(),
            passed: verdict.passed_count(),
            total: verdict.total_count(),
            points_earned: outcome.points_delta,
            timed_out: verdict.timed_out,
        });
    }

    async fn handle_tick(&mut self) {
        if self.contest.status != ContestStatus::Active {
            return;
        }
        let now = Utc::now();
        // The room's own clock is authoritative even if the timer task lags
        if self.contest.past_end(now) {
            self.complete().await;
            return;
        }
        self.broadcast(ServerMessage::ProgressUpdate {
            leaderboard: self.leaderboard(),
            remaining_ms: self.contest.remaining_ms(now),
        });
    }

    // -- helpers ------------------------------------------------------------

    /// Shared preconditions for run-code and submit-code
    fn check_submittable(
        &self,
        participant_id: Uuid,
        challenge_index: usize,
    ) -> AppResult<&crate::models::Challenge> {
        let now = Utc::now();
        if self.contest.status == ContestStatus::Completed || self.contest.past_end(now) {
            return Err(AppError::ContestEnded);
        }
        if self.contest.status != ContestStatus::Active {
            return Err(AppError::InvalidTransition(
                "contest has not started".to_string(),
            ));
        }
        if !self.participants.contains_key(&participant_id) {
            return Err(AppError::NotJoined);
        }
        self.contest
            .challenges
            .get(challenge_index)
            .ok_or_else(|| AppError::InvalidInput(format!("no challenge at index {challenge_index}")))
    }

    fn require_host(&mut self, participant_id: Uuid) -> bool {
        if self.hosts.contains(&participant_id) {
            true
        } else {
            self.send_error(participant_id, &AppError::NotHost);
            false
        }
    }

    fn joined_snapshot(&self, id: Uuid, now: DateTime<Utc>) -> JoinedPayload {
        let started = matches!(self.contest.status, ContestStatus::Active);
        let participant = self.participants.get(&id);

        JoinedPayload {
            participant_id: id,
            status: self.contest.status,
            title: self.contest.title.clone(),
            host_name: self.contest.host_name.clone(),
            challenges: started.then(|| ChallengeView::all(&self.contest)),
            ends_at_ms: self.contest.ends_at.map(|t| t.timestamp_millis()),
            remaining_ms: started.then(|| self.contest.remaining_ms(now)),
            submitted_indices: participant.map(|p| p.submitted_indices()).unwrap_or_default(),
            solved_indices: participant.map(|p| p.solved_indices()).unwrap_or_default(),
            score: participant.map(|p| p.score).unwrap_or(0),
            solved_count: participant.map(|p| p.solved_count).unwrap_or(0),
            participants: self.roster(),
        }
    }

    fn roster(&self) -> Vec<ParticipantView> {
        let mut roster: Vec<&Participant> = self.participants.values().collect();
        roster.sort_by_key(|p| p.join_order);
        roster.into_iter().map(ParticipantView::from_participant).collect()
    }

    fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        leaderboard::compute(self.participants.values())
    }

    fn stats(&self) -> ContestStats {
        ContestStats {
            participant_count: self.participants.len() as u32,
            total_submissions: self.total_submissions,
            fully_solved: self.participants.values().map(|p| p.solved_count).sum(),
            duration_ms: self
                .contest
                .started_at
                .map(|t| (Utc::now() - t).num_milliseconds().max(0) as u64)
                .unwrap_or(0),
        }
    }

    fn elapsed_ms(&self, now: DateTime<Utc>) -> u64 {
        self.contest
            .started_at
            .map(|t| (now - t).num_milliseconds().max(0) as u64)
            .unwrap_or(0)
    }

    fn broadcast(&mut self, message: ServerMessage) {
        self.conns.retain(|_, tx| tx.send(message.clone()).is_ok());
    }

    fn send_to(&mut self, participant_id: Uuid, message: ServerMessage) {
        if let Some(tx) = self.conns.get(&participant_id) {
            if tx.send(message).is_err() {
                self.conns.remove(&participant_id);
            }
        }
    }

    fn send_error(&mut self, participant_id: Uuid, error: &AppError) {
        self.send_to(
            participant_id,
            ServerMessage::Error {
                code: error.error_code().to_string(),
                message: error.to_string(),
            },
        );
    }

    fn broadcast_roster(&mut self) {
        self.broadcast(ServerMessage::ParticipantUpdate {
            participants: self.roster(),
        });
    }

    /// Forward the audit row to the store without blocking the queue
    fn append_audit(&self, audit: SubmissionAudit) {
        let store = self.deps.store.clone();
        tokio::spawn(async move {
            if let Err(e) = store.append_submission(&audit).await {
                tracing::warn!(error = %e, "failed to append submission audit row");
            }
        });
    }

    /// Deregister a room that has sat with no connections for the idle
    /// period. Active rooms are left to their end timer; the stored contest
    /// is untouched, so a later join simply reloads and respawns it.
    fn handle_idle_check(&mut self) {
        if self.conns.is_empty()
            && !matches!(
                self.contest.status,
                ContestStatus::Active | ContestStatus::Completed
            )
        {
            self.deps.registry.remove(&self.contest.join_code);
            tracing::info!(contest = %self.contest.join_code, "idle room reaped");
        }
    }

    /// Schedule an idle check; holds only a weak queue handle
    fn arm_idle_timer(&self) {
        let idle = Duration::from_millis(self.deps.room_idle_timeout_ms.max(100));
        let weak = self.self_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(idle).await;
            if let Some(tx) = weak.upgrade() {
                let _ = tx.send(Command::IdleCheck);
            }
        });
    }

    /// Room-owned end timer plus the progress heartbeat. Both hold only weak
    /// queue handles, so neither keeps a dead room alive.
    fn spawn_timers(&mut self) {
        if self.timers_started {
            return;
        }
        self.timers_started = true;

        let remaining = self.contest.remaining_ms(Utc::now());
        let weak = self.self_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(remaining)).await;
            if let Some(tx) = weak.upgrade() {
                let _ = tx.send(Command::TimerExpired);
            }
        });

        let interval_ms = self.deps.heartbeat_interval_ms.max(100);
        let weak = self.self_tx.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(interval_ms));
            // The first tick completes immediately; skip it
            interval.tick().await;
            loop {
                interval.tick().await;
                match weak.upgrade() {
                    Some(tx) if tx.send(Command::Tick).is_ok() => {}
                    _ => break,
                }
            }
        });
    }
}
