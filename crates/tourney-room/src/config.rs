//! Room phases and the rules that tune the state machine.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// The lifecycle stage of a room (or of the legacy session).
///
/// Transitions only move forward:
///
/// ```text
/// Collecting → Voting → (Voting …) → Completed
/// ```
///
/// - **Collecting**: participants submit entries, one each.
/// - **Voting**: two entries are paired in a round; participants vote.
///   Each resolved round either starts another round or completes.
/// - **Completed**: one entry is left and has been crowned the winner.
///   Nothing leaves this phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Collecting,
    Voting,
    Completed,
}

impl Phase {
    /// Returns `true` if entries can still be submitted.
    pub fn accepts_entries(&self) -> bool {
        matches!(self, Self::Collecting)
    }

    /// Returns `true` if no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Returns `true` if moving from `self` to `target` follows the
    /// lifecycle. `Voting → Voting` is a new round.
    pub fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Collecting, Self::Voting)
                | (Self::Voting, Self::Voting)
                | (Self::Voting, Self::Completed)
        )
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Collecting => write!(f, "collecting"),
            Self::Voting => write!(f, "voting"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

// ---------------------------------------------------------------------------
// VotePolicy
// ---------------------------------------------------------------------------

/// How repeated votes from the same participant within one round count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VotePolicy {
    /// A participant already recorded as a voter this round is ignored.
    #[default]
    OncePerRound,

    /// Every vote is tallied, including repeats by the same participant.
    /// `voters` is then informational only.
    Repeated,
}

/// Returned when a vote policy name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown vote policy {0:?} (expected \"once\" or \"repeated\")")]
pub struct UnknownVotePolicy(pub String);

impl FromStr for VotePolicy {
    type Err = UnknownVotePolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "once" | "once_per_round" => Ok(Self::OncePerRound),
            "repeated" | "repeat" => Ok(Self::Repeated),
            _ => Err(UnknownVotePolicy(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// Tunables applied to every transition.
///
/// Held by the [`Store`](crate::Store) and passed to
/// [`reduce`](crate::reduce), so the same action log replays identically
/// under the same rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rules {
    pub vote_policy: VotePolicy,
}

impl Rules {
    /// Rules with the given vote policy.
    pub fn with_vote_policy(vote_policy: VotePolicy) -> Self {
        Self { vote_policy }
    }
}
