//! The whole application state at one instant.
//!
//! A [`Snapshot`] is never mutated. Each transition builds a new one,
//! cloning the room map (reference-count bumps only) and replacing just
//! the room it touched, so untouched rooms keep their `Arc` identity from
//! one snapshot to the next. Readers holding an older snapshot never see a
//! partially updated room.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tourney_protocol::{ParticipantId, RoomId};

use crate::{Bracket, Entry, RoomError};
use crate::room::Room;

/// Either the legacy anonymous session or the room map.
///
/// A process starts in legacy mode. The first `CREATE_ROOM` switches to
/// room mode, discarding the legacy session; there is no way back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Snapshot {
    Legacy { session: Arc<Bracket> },
    Rooms { rooms: BTreeMap<RoomId, Arc<Room>> },
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::Legacy {
            session: Arc::new(Bracket::new()),
        }
    }
}

impl Snapshot {
    pub fn is_legacy(&self) -> bool {
        matches!(self, Self::Legacy { .. })
    }

    /// The legacy session, while legacy mode lasts.
    pub fn legacy(&self) -> Option<&Arc<Bracket>> {
        match self {
            Self::Legacy { session } => Some(session),
            Self::Rooms { .. } => None,
        }
    }

    pub fn room(&self, room_id: &RoomId) -> Option<&Arc<Room>> {
        match self {
            Self::Rooms { rooms } => rooms.get(room_id),
            Self::Legacy { .. } => None,
        }
    }

    /// All rooms, ordered by id.
    pub fn rooms(&self) -> impl Iterator<Item = &Arc<Room>> {
        let rooms = match self {
            Self::Rooms { rooms } => Some(rooms.values()),
            Self::Legacy { .. } => None,
        };
        rooms.into_iter().flatten()
    }

    pub fn room_count(&self) -> usize {
        match self {
            Self::Rooms { rooms } => rooms.len(),
            Self::Legacy { .. } => 0,
        }
    }

    // -- Transitions --------------------------------------------------------

    /// Inserts a new room owned by `creator`.
    pub fn create_room(
        &self,
        room_id: &RoomId,
        name: &str,
        theme: &str,
        creator: &ParticipantId,
    ) -> Result<Self, RoomError> {
        let mut rooms = match self {
            Self::Rooms { rooms } => rooms.clone(),
            Self::Legacy { .. } => BTreeMap::new(),
        };
        if rooms.contains_key(room_id) {
            return Err(RoomError::AlreadyExists(room_id.clone()));
        }

        let room = Room::new(room_id.clone(), name, theme, creator.clone());
        rooms.insert(room_id.clone(), Arc::new(room));
        Ok(Self::Rooms { rooms })
    }

    /// Seeds the legacy session's entries. Only valid before any room
    /// exists.
    pub fn set_entries(&self, entries: &[Entry]) -> Result<Self, RoomError> {
        let session = self.legacy().ok_or(RoomError::LegacyDisabled)?;
        Ok(Self::Legacy {
            session: Arc::new(session.seed(entries)?),
        })
    }

    /// Replaces one room with `f(room)`.
    pub fn update_room(
        &self,
        room_id: &RoomId,
        f: impl FnOnce(&Room) -> Result<Room, RoomError>,
    ) -> Result<Self, RoomError> {
        let room = self
            .room(room_id)
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))?;
        let updated = f(room)?;

        let mut rooms = match self {
            Self::Rooms { rooms } => rooms.clone(),
            Self::Legacy { .. } => BTreeMap::new(),
        };
        rooms.insert(room_id.clone(), Arc::new(updated));
        Ok(Self::Rooms { rooms })
    }

    /// Replaces a bracket with `f(bracket)`: the room's when `room_id` is
    /// given, otherwise the legacy session's.
    pub fn update_bracket(
        &self,
        room_id: Option<&RoomId>,
        f: impl FnOnce(&Bracket) -> Result<Bracket, RoomError>,
    ) -> Result<Self, RoomError> {
        match room_id {
            Some(room_id) => self.update_room(room_id, |room| room.with_bracket(f)),
            None => {
                let session = self.legacy().ok_or(RoomError::LegacyDisabled)?;
                Ok(Self::Legacy {
                    session: Arc::new(f(session)?),
                })
            }
        }
    }
}
