//! Reasons an action leaves the state unchanged.
//!
//! [`reduce`](crate::reduce) never fails: an inapplicable action is a
//! no-op. [`validate`](crate::validate) reports *why* it would be one, so
//! the transport can turn the no-op into a message the user sees.

use tourney_protocol::{ParticipantId, RoomId};

use crate::Phase;

/// Why an action was (or would be) ignored.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// The room does not exist.
    #[error("room {0} not found")]
    NotFound(RoomId),

    /// A room with this id already exists.
    #[error("room {0} already exists")]
    AlreadyExists(RoomId),

    /// The legacy anonymous session is gone once any room exists.
    #[error("legacy session is disabled once a room exists")]
    LegacyDisabled,

    /// The action needs a different phase.
    #[error("expected phase {expected}, room is {actual}")]
    InvalidPhase { expected: Phase, actual: Phase },

    /// The participant already submitted an entry in this room.
    #[error("{0} already submitted an entry")]
    DuplicateEntry(ParticipantId),

    /// Voting needs at least two entries.
    #[error("at least 2 entries are needed to start voting, have {0}")]
    NotEnoughEntries(usize),

    /// The voted entry is not one of the two in the current round.
    #[error("{0:?} is not in the current round")]
    UnknownEntry(String),

    /// The participant already voted this round.
    #[error("{0} already voted this round")]
    AlreadyVoted(ParticipantId),

    /// Only the room's creator may start voting or advance rounds.
    #[error("only the creator of room {room_id} can do that, not {participant}")]
    NotCreator {
        room_id: RoomId,
        participant: ParticipantId,
    },
}

impl RoomError {
    /// HTTP-style status code used when reporting this to a client.
    pub fn code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::NotCreator { .. } => 403,
            Self::NotEnoughEntries(_) | Self::UnknownEntry(_) => 400,
            Self::AlreadyExists(_)
            | Self::LegacyDisabled
            | Self::InvalidPhase { .. }
            | Self::DuplicateEntry(_)
            | Self::AlreadyVoted(_) => 409,
        }
    }
}
