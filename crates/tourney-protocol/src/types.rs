//! Core protocol types for Tourney's wire format.
//!
//! This module defines every type that travels "on the wire": the
//! identities that name rooms and participants, the requests a client can
//! send, and the messages the server pushes back.
//!
//! Think of this as the "language" that the browser client and the server
//! speak.

use serde::{Deserialize, Serialize};

use std::fmt;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// The identity of a participant: the name they chose when creating or
/// joining a room.
///
/// Names are trusted as given. Two connections presenting the same name
/// are the same participant as far as the room state is concerned.
///
/// `#[serde(transparent)]` serializes this as a plain string, so
/// `ParticipantId("alice")` becomes `"alice"` in JSON rather than
/// `{ "0": "alice" }`.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ParticipantId(pub String);

impl ParticipantId {
    /// Creates a participant identity from anything string-like.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the participant's name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ParticipantId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// A unique identifier for a room (one tournament session).
///
/// Rooms are addressed by opaque strings so clients can share them as
/// invite codes. Server-generated ids come from [`RoomId::generate`].
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl RoomId {
    /// Creates a room id from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh random room id.
    ///
    /// 16 random bytes (128 bits) rendered as 32 lowercase hex characters.
    /// Collisions are not checked here; creating a room under an id that
    /// already exists is a no-op at the state machine level.
    pub fn generate() -> Self {
        use rand::Rng;

        let bytes: [u8; 16] = rand::rng().random();
        Self(bytes.iter().map(|b| format!("{b:02x}")).collect())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

// ---------------------------------------------------------------------------
// ClientRequest: what a browser can ask for
// ---------------------------------------------------------------------------

/// Requests a client sends to the server.
///
/// `#[serde(tag = "type", rename_all = "snake_case")]` produces internally
/// tagged JSON:
///   `{ "type": "join_room", "username": "bob", "room_id": "ab12..." }`
///
/// Requests after `CreateRoom`/`JoinRoom` carry no identity: the server
/// uses the participant and room the connection was bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientRequest {
    /// Open a new room with the sender as its creator.
    CreateRoom {
        username: ParticipantId,
        room_name: String,
        theme: String,
    },

    /// Enter an existing room.
    JoinRoom {
        username: ParticipantId,
        room_id: RoomId,
    },

    /// Submit the sender's candidate entry.
    AddEntry { entry: String },

    /// Creator only: begin the first round.
    StartVoting,

    /// Vote for one of the two entries in the current round.
    Vote { entry: String },

    /// Creator only: resolve the current round and advance.
    Next,
}

// ---------------------------------------------------------------------------
// ServerMessage: what the server pushes
// ---------------------------------------------------------------------------

/// Messages the server sends to a client.
///
/// Generic over the state payload `S` so this crate stays independent of
/// the room model: the server instantiates it with the room (or the legacy
/// session) it is publishing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage<S> {
    /// A room was created; the sender is now bound to it.
    RoomCreated { room_id: RoomId },

    /// The sender joined an existing room.
    RoomJoined { room_id: RoomId },

    /// The latest state of the room the receiver is in.
    State { state: S },

    /// A request was rejected.
    /// `code` follows HTTP-style conventions (400 = bad request,
    /// 403 = forbidden, 404 = not found, 409 = conflict).
    Error { code: u16, message: String },
}

impl<S> ServerMessage<S> {
    /// Shorthand for building an [`ServerMessage::Error`].
    pub fn error(code: u16, message: impl Into<String>) -> Self {
        Self::Error {
            code,
            message: message.into(),
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
