//! The elimination bracket: entries, rounds, and the tie policy.
//!
//! A [`Bracket`] is the tournament half of a room. It owns the pending
//! entry queue, the current [`VoteRound`], and eventually the winner.
//! Every operation takes `&self` and returns a *new* bracket, or the
//! [`RoomError`] explaining why the operation does not apply.
//!
//! ```text
//!            start_voting (≥2 entries)        advance (>1 left)
//! Collecting ─────────────────────────→ Voting ────────────────→ Voting
//!     ↺ add_entry                         ↺ vote      │
//!                                                     │ advance (1 left)
//!                                                     ▼
//!                                                 Completed
//! ```

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tourney_protocol::ParticipantId;

use crate::{Phase, RoomError, VotePolicy};

// ---------------------------------------------------------------------------
// Entry
// ---------------------------------------------------------------------------

/// One candidate submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// The candidate text. Votes and tallies refer to entries by content.
    pub content: String,
    /// Who submitted it.
    pub author: ParticipantId,
}

impl Entry {
    pub fn new(content: impl Into<String>, author: impl Into<ParticipantId>) -> Self {
        Self {
            content: content.into(),
            author: author.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// VoteRound
// ---------------------------------------------------------------------------

/// One pairwise contest.
///
/// `tally` only has a key for an entry once it has received a vote, and
/// counts never decrease within a round. `voters` grows monotonically and
/// starts empty each round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRound {
    pub pair: [Entry; 2],
    pub tally: BTreeMap<String, u32>,
    pub voters: BTreeSet<ParticipantId>,
}

impl VoteRound {
    fn new(first: Entry, second: Entry) -> Self {
        Self {
            pair: [first, second],
            tally: BTreeMap::new(),
            voters: BTreeSet::new(),
        }
    }

    /// Votes cast so far for the entry with this content.
    pub fn votes_for(&self, content: &str) -> u32 {
        self.tally.get(content).copied().unwrap_or(0)
    }

    /// Whether `content` names one of the two paired entries.
    pub fn contains(&self, content: &str) -> bool {
        self.pair.iter().any(|e| e.content == content)
    }

    pub fn has_voted(&self, participant: &ParticipantId) -> bool {
        self.voters.contains(participant)
    }

    /// The entries that survive this round.
    ///
    /// A strictly higher count wins outright. Equal counts, 0–0 included,
    /// eliminate nobody: both entries advance, first one first.
    pub fn survivors(&self) -> Vec<Entry> {
        let [a, b] = &self.pair;
        let (a_votes, b_votes) = (self.votes_for(&a.content), self.votes_for(&b.content));

        if a_votes > b_votes {
            vec![a.clone()]
        } else if b_votes > a_votes {
            vec![b.clone()]
        } else {
            vec![a.clone(), b.clone()]
        }
    }
}

// ---------------------------------------------------------------------------
// Bracket
// ---------------------------------------------------------------------------

/// Tournament state for one session.
///
/// The variants make the phase invariants structural: a round exists only
/// while voting, and a winner exists only once completed, at which point
/// the queue and round are gone.
///
/// Serialized with the phase as a tag, so a voting bracket becomes
/// `{ "phase": "voting", "entries": [...], "vote": {...} }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum Bracket {
    Collecting {
        entries: Vec<Entry>,
    },
    Voting {
        /// Entries waiting for a round, in queue order.
        entries: Vec<Entry>,
        vote: VoteRound,
    },
    Completed {
        winner: Entry,
    },
}

impl Default for Bracket {
    fn default() -> Self {
        Self::Collecting {
            entries: Vec::new(),
        }
    }
}

impl Bracket {
    /// An empty bracket in the collecting phase.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        match self {
            Self::Collecting { .. } => Phase::Collecting,
            Self::Voting { .. } => Phase::Voting,
            Self::Completed { .. } => Phase::Completed,
        }
    }

    /// Pending entries (submissions while collecting, the queue while
    /// voting). Empty once completed.
    pub fn entries(&self) -> &[Entry] {
        match self {
            Self::Collecting { entries } | Self::Voting { entries, .. } => entries,
            Self::Completed { .. } => &[],
        }
    }

    pub fn vote_round(&self) -> Option<&VoteRound> {
        match self {
            Self::Voting { vote, .. } => Some(vote),
            _ => None,
        }
    }

    pub fn winner(&self) -> Option<&Entry> {
        match self {
            Self::Completed { winner } => Some(winner),
            _ => None,
        }
    }

    /// Appends an entry by `author`, who must not have one already.
    pub fn add_entry(&self, author: &ParticipantId, content: &str) -> Result<Self, RoomError> {
        let Self::Collecting { entries } = self else {
            return Err(self.wrong_phase(Phase::Collecting));
        };
        if entries.iter().any(|e| &e.author == author) {
            return Err(RoomError::DuplicateEntry(author.clone()));
        }

        let mut entries = entries.clone();
        entries.push(Entry::new(content, author.clone()));
        Ok(Self::Collecting { entries })
    }

    /// Replaces the submissions wholesale. Only while collecting.
    pub fn seed(&self, entries: &[Entry]) -> Result<Self, RoomError> {
        if !self.phase().accepts_entries() {
            return Err(self.wrong_phase(Phase::Collecting));
        }
        Ok(Self::Collecting {
            entries: entries.to_vec(),
        })
    }

    /// Pairs the first two submissions and opens voting.
    pub fn start_voting(&self) -> Result<Self, RoomError> {
        let Self::Collecting { entries } = self else {
            return Err(self.wrong_phase(Phase::Collecting));
        };
        Self::round_from(entries.clone()).ok_or(RoomError::NotEnoughEntries(entries.len()))
    }

    /// Records a vote for the paired entry whose content is `content`.
    pub fn vote(
        &self,
        participant: &ParticipantId,
        content: &str,
        policy: VotePolicy,
    ) -> Result<Self, RoomError> {
        let Self::Voting { entries, vote } = self else {
            return Err(self.wrong_phase(Phase::Voting));
        };
        if !vote.contains(content) {
            return Err(RoomError::UnknownEntry(content.to_string()));
        }
        if policy == VotePolicy::OncePerRound && vote.has_voted(participant) {
            return Err(RoomError::AlreadyVoted(participant.clone()));
        }

        let mut vote = vote.clone();
        *vote.tally.entry(content.to_string()).or_insert(0) += 1;
        vote.voters.insert(participant.clone());
        Ok(Self::Voting {
            entries: entries.clone(),
            vote,
        })
    }

    /// Resolves the current round.
    ///
    /// Survivors go to the back of the queue, behind entries that have
    /// not played yet. One entry left means it wins; otherwise the next
    /// two from the front are paired.
    pub fn advance(&self) -> Result<Self, RoomError> {
        let Self::Voting { entries, vote } = self else {
            return Err(self.wrong_phase(Phase::Voting));
        };

        let mut queue = entries.clone();
        queue.extend(vote.survivors());

        if queue.len() == 1 {
            let winner = queue.remove(0);
            return Ok(Self::Completed { winner });
        }
        let len = queue.len();
        Self::round_from(queue).ok_or(RoomError::NotEnoughEntries(len))
    }

    /// Pairs the front two entries of `queue`, or `None` when it holds
    /// fewer than two.
    fn round_from(queue: Vec<Entry>) -> Option<Self> {
        let mut queue = queue.into_iter();
        let (first, second) = (queue.next()?, queue.next()?);
        Some(Self::Voting {
            entries: queue.collect(),
            vote: VoteRound::new(first, second),
        })
    }

    fn wrong_phase(&self, expected: Phase) -> RoomError {
        RoomError::InvalidPhase {
            expected,
            actual: self.phase(),
        }
    }
}
