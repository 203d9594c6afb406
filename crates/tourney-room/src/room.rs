//! A room: who is in it, what it's about, and its bracket.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tourney_protocol::{ParticipantId, RoomId};

use crate::{Bracket, Entry, Phase, RoomError, VoteRound};

/// One independent voting session.
///
/// The bracket is flattened into the room on the wire, so clients see
/// `phase`, `entries`, `vote` and `winner` next to the room metadata:
///
/// ```text
/// { "id": "…", "name": "Friday", "theme": "Movies", "creator": "alice",
///   "participants": ["alice", "bob"],
///   "phase": "voting", "entries": [...], "vote": { "pair": [...], ... } }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    pub theme: String,
    pub creator: ParticipantId,
    pub participants: BTreeSet<ParticipantId>,
    #[serde(flatten)]
    pub bracket: Bracket,
}

impl Room {
    /// A fresh room whose only participant is its creator.
    pub fn new(
        id: RoomId,
        name: impl Into<String>,
        theme: impl Into<String>,
        creator: ParticipantId,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            theme: theme.into(),
            participants: BTreeSet::from([creator.clone()]),
            creator,
            bracket: Bracket::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.bracket.phase()
    }

    pub fn entries(&self) -> &[Entry] {
        self.bracket.entries()
    }

    pub fn vote_round(&self) -> Option<&VoteRound> {
        self.bracket.vote_round()
    }

    pub fn winner(&self) -> Option<&Entry> {
        self.bracket.winner()
    }

    pub fn is_participant(&self, participant: &ParticipantId) -> bool {
        self.participants.contains(participant)
    }

    /// This room with `participant` added. Set semantics: joining twice
    /// is the same as joining once.
    pub fn with_participant(&self, participant: &ParticipantId) -> Self {
        let mut room = self.clone();
        room.participants.insert(participant.clone());
        room
    }

    /// This room with its bracket replaced by `f(bracket)`.
    pub fn with_bracket(
        &self,
        f: impl FnOnce(&Bracket) -> Result<Bracket, RoomError>,
    ) -> Result<Self, RoomError> {
        let bracket = f(&self.bracket)?;
        Ok(Self {
            bracket,
            ..self.clone()
        })
    }

    /// Checks that `participant` created this room.
    ///
    /// Starting the vote and advancing rounds are creator-only; the state
    /// machine itself does not know who asked, so the transport calls this
    /// before dispatching.
    pub fn authorize_creator(&self, participant: &ParticipantId) -> Result<(), RoomError> {
        if &self.creator == participant {
            Ok(())
        } else {
            Err(RoomError::NotCreator {
                room_id: self.id.clone(),
                participant: participant.clone(),
            })
        }
    }
}
