//! Per-connection handler: decode requests, turn them into actions.
//!
//! Each accepted connection gets its own Tokio task running
//! [`handle_connection`]. The flow is:
//!   1. Register with the [`Registry`](crate::registry::Registry) and
//!      spawn a writer task draining the outbound queue
//!   2. Loop: receive a frame, decode a [`ClientRequest`], handle it
//!   3. On close, unregister (via [`ConnectionGuard`])
//!
//! Request handling itself is synchronous: the store and the registry
//! both lock only briefly and never across an await.

use std::sync::Arc;

use tourney_protocol::{ClientRequest, Codec, ParticipantId, ProtocolError, RoomId};
use tourney_room::{Action, RoomError};
use tourney_transport::{Connection, ConnectionId, WebSocketConnection};

use crate::TourneyError;
use crate::registry::{Binding, Outgoing};
use crate::server::ServerState;

/// Unregisters the connection when the handler exits, even on panic.
struct ConnectionGuard {
    id: ConnectionId,
    state: Arc<ServerState>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.state.registry.unregister(self.id);
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection(
    conn: WebSocketConnection,
    state: Arc<ServerState>,
) -> Result<(), TourneyError> {
    let conn_id = conn.id();
    let conn = Arc::new(conn);
    tracing::debug!(%conn_id, peer = %conn.peer_addr(), "handling new connection");

    let mut outbound = state.registry.register(conn_id);
    let _guard = ConnectionGuard {
        id: conn_id,
        state: Arc::clone(&state),
    };

    let writer = {
        let conn = Arc::clone(&conn);
        tokio::spawn(async move {
            while let Some(frame) = outbound.recv().await {
                if let Err(e) = conn.send(&frame).await {
                    tracing::debug!(%conn_id, error = %e, "send failed, stopping writer");
                    break;
                }
            }
        })
    };

    let result = read_loop(&conn, &state, conn_id).await;
    writer.abort();
    if let Err(e) = conn.close().await {
        tracing::debug!(%conn_id, error = %e, "close after read loop failed");
    }
    result
}

async fn read_loop(
    conn: &WebSocketConnection,
    state: &ServerState,
    conn_id: ConnectionId,
) -> Result<(), TourneyError> {
    loop {
        let frame = match conn.recv().await? {
            Some(frame) => frame,
            None => {
                tracing::debug!(%conn_id, "connection closed cleanly");
                return Ok(());
            }
        };

        match state.codec.decode::<ClientRequest>(&frame) {
            Ok(request) => handle_request(state, conn_id, request),
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "failed to decode request");
                send_error(state, conn_id, 400, format!("invalid request: {e}"));
            }
        }
    }
}

/// Applies one client request on behalf of `conn_id`.
pub(crate) fn handle_request(state: &ServerState, conn_id: ConnectionId, request: ClientRequest) {
    match request {
        ClientRequest::CreateRoom {
            username,
            room_name,
            theme,
        } => {
            let Some(participant) = participant(state, conn_id, &username) else {
                return;
            };
            let room_id = RoomId::generate();
            let action = Action::CreateRoom {
                room_id: room_id.clone(),
                name: room_name,
                theme,
                creator: participant.clone(),
            };
            if let Err(e) = state.store.try_dispatch(action) {
                return reject(state, conn_id, &e);
            }
            state.registry.bind(
                conn_id,
                Binding {
                    participant,
                    room_id: room_id.clone(),
                },
                &Outgoing::RoomCreated { room_id },
            );
        }

        ClientRequest::JoinRoom { username, room_id } => {
            let Some(participant) = participant(state, conn_id, &username) else {
                return;
            };
            let action = Action::JoinRoom {
                room_id: room_id.clone(),
                participant: participant.clone(),
            };
            if let Err(e) = state.store.try_dispatch(action) {
                return reject(state, conn_id, &e);
            }
            state.registry.bind(
                conn_id,
                Binding {
                    participant,
                    room_id: room_id.clone(),
                },
                &Outgoing::RoomJoined { room_id },
            );
        }

        ClientRequest::AddEntry { entry } => {
            let Some(binding) = state.registry.binding(conn_id) else {
                return send_error(state, conn_id, 400, "join a room before adding an entry");
            };
            dispatch(
                state,
                conn_id,
                Action::AddEntry {
                    room_id: binding.room_id,
                    participant: binding.participant,
                    content: entry,
                },
            );
        }

        ClientRequest::StartVoting => {
            let room_id = match creator_room(state, conn_id) {
                Ok(room_id) => room_id,
                Err(e) => return reject(state, conn_id, &e),
            };
            dispatch(state, conn_id, Action::StartVoting { room_id });
        }

        ClientRequest::Vote { entry } => {
            let (room_id, participant) = match state.registry.binding(conn_id) {
                Some(binding) => (Some(binding.room_id), binding.participant),
                // Anonymous legacy voter.
                None => (None, ParticipantId::new(conn_id.to_string())),
            };
            dispatch(
                state,
                conn_id,
                Action::Vote {
                    room_id,
                    participant,
                    content: entry,
                },
            );
        }

        ClientRequest::Next => {
            let room_id = match creator_room(state, conn_id) {
                Ok(room_id) => room_id,
                Err(e) => return reject(state, conn_id, &e),
            };
            dispatch(state, conn_id, Action::Next { room_id });
        }
    }
}

/// The room a creator-only request targets. `None` means the legacy
/// session, which has no creator.
fn creator_room(state: &ServerState, conn_id: ConnectionId) -> Result<Option<RoomId>, RoomError> {
    let Some(binding) = state.registry.binding(conn_id) else {
        return Ok(None);
    };
    let snapshot = state.store.snapshot();
    let room = snapshot
        .room(&binding.room_id)
        .ok_or_else(|| RoomError::NotFound(binding.room_id.clone()))?;
    room.authorize_creator(&binding.participant)?;
    Ok(Some(binding.room_id))
}

/// The participant a `create_room`/`join_room` speaks for, or a 400 to the
/// sender when the name is blank.
fn participant(
    state: &ServerState,
    conn_id: ConnectionId,
    username: &ParticipantId,
) -> Option<ParticipantId> {
    match normalize_username(username) {
        Ok(participant) => Some(participant),
        Err(e) => {
            send_error(state, conn_id, 400, e.to_string());
            None
        }
    }
}

fn normalize_username(username: &ParticipantId) -> Result<ParticipantId, ProtocolError> {
    let trimmed = username.as_str().trim();
    if trimmed.is_empty() {
        return Err(ProtocolError::InvalidMessage(
            "username must not be empty".into(),
        ));
    }
    Ok(ParticipantId::new(trimmed))
}

fn dispatch(state: &ServerState, conn_id: ConnectionId, action: Action) {
    if let Err(e) = state.store.try_dispatch(action) {
        reject(state, conn_id, &e);
    }
}

fn reject(state: &ServerState, conn_id: ConnectionId, error: &RoomError) {
    send_error(state, conn_id, error.code(), error.to_string());
}

fn send_error(state: &ServerState, conn_id: ConnectionId, code: u16, message: impl Into<String>) {
    state.registry.send(conn_id, &Outgoing::error(code, message));
}
