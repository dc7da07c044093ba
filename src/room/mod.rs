//! Contest rooms
//!
//! One room per live contest: a strictly-serialized state machine owning the
//! authoritative contest and participant state. All mutating operations enter
//! as [`Command`]s on an mpsc queue and execute one at a time, which removes
//! lost-update races between concurrent submissions without locks. Different
//! contests run fully independently.

mod actor;
mod command;
mod registry;

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::judge::JudgeClient;
use crate::models::Contest;
use crate::store::ContestStore;

pub use command::{Command, OutboundTx};
pub use registry::RoomRegistry;

/// Shared dependencies handed to every room
#[derive(Clone)]
pub struct RoomDeps {
    pub judge: Arc<dyn JudgeClient>,
    pub store: Arc<dyn ContestStore>,
    pub registry: Arc<RoomRegistry>,
    pub heartbeat_interval_ms: u64,
    pub per_test_timeout_ms: u64,
    pub room_idle_timeout_ms: u64,
}

/// Cheap cloneable handle to a running room task
#[derive(Clone)]
pub struct RoomHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl RoomHandle {
    /// Spawn the room task for a loaded contest
    pub fn spawn(contest: Contest, deps: RoomDeps) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = Self { tx: tx.clone() };
        tokio::spawn(actor::ContestRoom::new(contest, deps, tx).run(rx));
        handle
    }

    /// Enqueue a command. Fails only once the room has been torn down.
    pub fn send(&self, command: Command) -> AppResult<()> {
        self.tx
            .send(command)
            .map_err(|_| AppError::ContestEnded)
    }

    /// Join the contest, returning the (possibly minted) participant id
    pub async fn join(
        &self,
        name: String,
        participant_id: Option<Uuid>,
        host_key: Option<String>,
        tx: OutboundTx,
    ) -> AppResult<Uuid> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Join {
            name,
            participant_id,
            host_key,
            tx,
            reply,
        })?;
        rx.await.map_err(|_| AppError::ContestEnded)?
    }
}
