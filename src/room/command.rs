//! Room commands
//!
//! Everything that can mutate a contest enters the room through this closed
//! command set, consumed strictly in arrival order by the room task. Judge
//! results re-enter as commands of their own, preserving the single-writer
//! invariant.

use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::error::AppResult;
use crate::judge::JudgeVerdict;
use crate::protocol::ServerMessage;

/// Outbound channel of one connected client
pub type OutboundTx = mpsc::UnboundedSender<ServerMessage>;

/// Commands accepted by a contest room
pub enum Command {
    /// A connection joins (or rejoins) the contest
    Join {
        name: String,
        /// Reconnect key; a fresh id is minted when absent
        participant_id: Option<Uuid>,
        /// Presented to act as host
        host_key: Option<String>,
        tx: OutboundTx,
        reply: oneshot::Sender<AppResult<Uuid>>,
    },
    /// A connection dropped; participant state is retained for reconnect
    Leave { participant_id: Uuid },
    /// Host: draft -> waiting
    Publish { participant_id: Uuid },
    /// Host: waiting -> active
    Start { participant_id: Uuid },
    /// Host: active -> completed
    End { participant_id: Uuid },
    /// Judge against visible test cases only
    RunCode {
        participant_id: Uuid,
        challenge_index: usize,
        code: String,
        language: String,
    },
    /// Scored judge request against all test cases
    SubmitCode {
        participant_id: Uuid,
        challenge_index: usize,
        code: String,
        language: String,
        client_time_ms: u64,
    },
    /// Judge result for a run re-entering the queue
    RunJudged {
        participant_id: Uuid,
        challenge_index: usize,
        verdict: JudgeVerdict,
    },
    /// Judge result for a submission re-entering the queue
    SubmitJudged {
        participant_id: Uuid,
        challenge_index: usize,
        /// Per-(participant, challenge) sequence token issued at dispatch
        seq: u64,
        /// Elapsed contest milliseconds when the submission was accepted
        elapsed_ms: u64,
        code: String,
        language: String,
        verdict: JudgeVerdict,
    },
    /// Heartbeat: broadcast progress and resync countdowns
    Tick,
    /// Reap check for a room that may have sat idle with no connections
    IdleCheck,
    /// The room-owned end timer fired
    TimerExpired,
}
