//! WebSocket handler - one task per client connection
//!
//! Inbound frames are deserialized into the closed [`ClientMessage`] set,
//! validated, and forwarded to the participant's room as commands. Outbound
//! [`ServerMessage`]s arrive on a per-connection channel the room writes to.

use axum::{
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;
use crate::protocol::{self, ClientMessage, ServerMessage};
use crate::room::{Command, RoomHandle};
use crate::state::AppState;

pub async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_socket(state, socket))
}

/// The room this connection has joined, if any
struct Session {
    room: RoomHandle,
    participant_id: Uuid,
}

async fn handle_socket(state: AppState, socket: WebSocket) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    let mut session: Option<Session> = None;

    loop {
        tokio::select! {
            // Outbound: forward queued server messages to the socket
            Some(message) = rx.recv() => {
                match serde_json::to_string(&message) {
                    Ok(json) => {
                        if sink.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => tracing::error!(error = %e, "failed to serialize server message"),
                }
            }
            // Inbound: read from the socket
            maybe_frame = stream.next() => {
                match maybe_frame {
                    Some(Ok(Message::Text(text))) => {
                        let message: ClientMessage = match serde_json::from_str(&text) {
                            Ok(m) => m,
                            Err(e) => {
                                send_error(&tx, &AppError::InvalidInput(format!("malformed message: {e}")));
                                continue;
                            }
                        };
                        handle_message(&state, &tx, &mut session, message).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => continue,
                }
            }
        }
    }

    // Connection gone; the room keeps the participant record for reconnect
    if let Some(session) = session {
        let _ = session.room.send(Command::Leave {
            participant_id: session.participant_id,
        });
    }
}

/// Validate and dispatch one inbound message
async fn handle_message(
    state: &AppState,
    tx: &mpsc::UnboundedSender<ServerMessage>,
    session: &mut Option<Session>,
    message: ClientMessage,
) {
    match message {
        ClientMessage::Join(payload) => {
            if session.is_some() {
                send_error(tx, &AppError::InvalidInput("already joined a contest".to_string()));
                return;
            }
            if let Err(e) = payload.validate() {
                send_error(tx, &e.into());
                return;
            }

            let room = match state.registry().get_or_load(&payload.code).await {
                Ok(room) => room,
                Err(e) => {
                    send_error(tx, &e);
                    return;
                }
            };

            match room
                .join(payload.name, payload.participant_id, payload.host_key, tx.clone())
                .await
            {
                Ok(participant_id) => {
                    *session = Some(Session { room, participant_id });
                }
                Err(e) => send_error(tx, &e),
            }
        }

        ClientMessage::Publish => {
            forward(tx, session, |id| Command::Publish { participant_id: id });
        }
        ClientMessage::Start => {
            forward(tx, session, |id| Command::Start { participant_id: id });
        }
        ClientMessage::End => {
            forward(tx, session, |id| Command::End { participant_id: id });
        }

        ClientMessage::RunCode(payload) => {
            if let Err(e) = validate_code_payload(&payload.code, &payload.language) {
                send_error(tx, &e);
                return;
            }
            forward(tx, session, |id| Command::RunCode {
                participant_id: id,
                challenge_index: payload.challenge_index,
                code: payload.code,
                language: payload.language,
            });
        }

        ClientMessage::SubmitCode(payload) => {
            if let Err(e) = validate_code_payload(&payload.code, &payload.language) {
                send_error(tx, &e);
                return;
            }
            forward(tx, session, |id| Command::SubmitCode {
                participant_id: id,
                challenge_index: payload.challenge_index,
                code: payload.code,
                language: payload.language,
                client_time_ms: payload.client_time_ms,
            });
        }

        ClientMessage::Ping => {
            let _ = tx.send(ServerMessage::Pong);
        }
    }
}

fn validate_code_payload(code: &str, language: &str) -> Result<(), AppError> {
    protocol::validate_source_code(code).map_err(|e| AppError::Validation(e.to_string()))?;
    protocol::validate_language(language).map_err(|e| AppError::Validation(e.to_string()))?;
    Ok(())
}

/// Forward a command to the joined room, or report that no room is joined
fn forward(
    tx: &mpsc::UnboundedSender<ServerMessage>,
    session: &Option<Session>,
    into_command: impl FnOnce(Uuid) -> Command,
) {
    match session {
        Some(s) => {
            if let Err(e) = s.room.send(into_command(s.participant_id)) {
                send_error(tx, &e);
            }
        }
        None => send_error(tx, &AppError::NotJoined),
    }
}

fn send_error(tx: &mpsc::UnboundedSender<ServerMessage>, error: &AppError) {
    let _ = tx.send(ServerMessage::Error {
        code: error.error_code().to_string(),
        message: error.to_string(),
    });
}
