//! Actions and the reducer that applies them.
//!
//! [`reduce`] is the state machine: a pure, total function from
//! `(snapshot, action)` to the next snapshot. An action that does not
//! apply returns the input unchanged. [`validate`] runs the same code path
//! and reports the reason instead.

use serde::{Deserialize, Serialize};
use tourney_protocol::{ParticipantId, RoomId};

use crate::{Bracket, Entry, RoomError, Rules, Snapshot};

/// Everything that can happen to the state, one variant per kind.
///
/// `StartVoting`, `Vote` and `Next` address the legacy anonymous session
/// when `room_id` is `None`.
///
/// Serialized with an upper-case `type` tag:
///   `{ "type": "JOIN_ROOM", "room_id": "…", "participant": "bob" }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    CreateRoom {
        room_id: RoomId,
        name: String,
        theme: String,
        creator: ParticipantId,
    },
    JoinRoom {
        room_id: RoomId,
        participant: ParticipantId,
    },
    AddEntry {
        room_id: RoomId,
        participant: ParticipantId,
        content: String,
    },
    StartVoting {
        #[serde(default)]
        room_id: Option<RoomId>,
    },
    Vote {
        #[serde(default)]
        room_id: Option<RoomId>,
        participant: ParticipantId,
        content: String,
    },
    Next {
        #[serde(default)]
        room_id: Option<RoomId>,
    },
    SetEntries {
        entries: Vec<Entry>,
    },
}

impl Action {
    /// The wire name of this action's kind, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CreateRoom { .. } => "CREATE_ROOM",
            Self::JoinRoom { .. } => "JOIN_ROOM",
            Self::AddEntry { .. } => "ADD_ENTRY",
            Self::StartVoting { .. } => "START_VOTING",
            Self::Vote { .. } => "VOTE",
            Self::Next { .. } => "NEXT",
            Self::SetEntries { .. } => "SET_ENTRIES",
        }
    }

    /// The room this action targets, if any.
    pub fn room_id(&self) -> Option<&RoomId> {
        match self {
            Self::CreateRoom { room_id, .. }
            | Self::JoinRoom { room_id, .. }
            | Self::AddEntry { room_id, .. } => Some(room_id),
            Self::StartVoting { room_id } | Self::Vote { room_id, .. } | Self::Next { room_id } => {
                room_id.as_ref()
            }
            Self::SetEntries { .. } => None,
        }
    }
}

/// Applies `action`, or explains why it does not apply.
pub fn apply(snapshot: &Snapshot, action: &Action, rules: &Rules) -> Result<Snapshot, RoomError> {
    match action {
        Action::CreateRoom {
            room_id,
            name,
            theme,
            creator,
        } => snapshot.create_room(room_id, name, theme, creator),

        Action::JoinRoom {
            room_id,
            participant,
        } => snapshot.update_room(room_id, |room| Ok(room.with_participant(participant))),

        Action::AddEntry {
            room_id,
            participant,
            content,
        } => snapshot.update_room(room_id, |room| {
            room.with_bracket(|bracket| bracket.add_entry(participant, content))
        }),

        Action::StartVoting { room_id } => {
            snapshot.update_bracket(room_id.as_ref(), Bracket::start_voting)
        }

        Action::Vote {
            room_id,
            participant,
            content,
        } => snapshot.update_bracket(room_id.as_ref(), |bracket| {
            bracket.vote(participant, content, rules.vote_policy)
        }),

        Action::Next { room_id } => snapshot.update_bracket(room_id.as_ref(), Bracket::advance),

        Action::SetEntries { entries } => snapshot.set_entries(entries),
    }
}

/// The next state after `action`. Never fails: an inapplicable action
/// yields an unchanged copy of `snapshot`.
pub fn reduce(snapshot: &Snapshot, action: &Action, rules: &Rules) -> Snapshot {
    apply(snapshot, action, rules).unwrap_or_else(|_| snapshot.clone())
}

/// Why `action` would be a no-op against `snapshot`, if it would be.
pub fn validate(snapshot: &Snapshot, action: &Action, rules: &Rules) -> Result<(), RoomError> {
    apply(snapshot, action, rules).map(|_| ())
}

/// Folds `actions` over the initial snapshot.
pub fn replay<'a>(actions: impl IntoIterator<Item = &'a Action>, rules: &Rules) -> Snapshot {
    actions
        .into_iter()
        .fold(Snapshot::default(), |snapshot, action| {
            reduce(&snapshot, action, rules)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_json_uses_upper_case_tag() {
        let action = Action::JoinRoom {
            room_id: RoomId::new("r1"),
            participant: ParticipantId::new("bob"),
        };
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["type"], "JOIN_ROOM");
        assert_eq!(json["participant"], "bob");
        assert_eq!(action.kind(), "JOIN_ROOM");
    }

    #[test]
    fn test_legacy_actions_decode_without_room_id() {
        let action: Action = serde_json::from_str(r#"{"type":"NEXT"}"#).unwrap();
        assert_eq!(action, Action::Next { room_id: None });
        assert_eq!(action.room_id(), None);
    }

    #[test]
    fn test_reduce_returns_input_on_no_op() {
        let snapshot = Snapshot::default();
        let action = Action::JoinRoom {
            room_id: RoomId::new("missing"),
            participant: ParticipantId::new("bob"),
        };
        let rules = Rules::default();
        assert_eq!(reduce(&snapshot, &action, &rules), snapshot);
        assert_eq!(
            validate(&snapshot, &action, &rules),
            Err(RoomError::NotFound(RoomId::new("missing")))
        );
    }

    #[test]
    fn test_replay_is_deterministic() {
        let log = vec![
            Action::CreateRoom {
                room_id: RoomId::new("r1"),
                name: "Friday".into(),
                theme: "Movies".into(),
                creator: ParticipantId::new("alice"),
            },
            Action::AddEntry {
                room_id: RoomId::new("r1"),
                participant: ParticipantId::new("alice"),
                content: "Alien".into(),
            },
        ];
        let rules = Rules::default();
        assert_eq!(replay(&log, &rules), replay(&log, &rules));
        assert_eq!(replay(&log, &rules).room_count(), 1);
    }
}
