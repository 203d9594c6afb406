//! Room state machine and action dispatcher for Tourney.
//!
//! Participants submit entries into a room, then the room pits two
//! entries against each other per round until one winner remains.
//!
//! # Key types
//!
//! - [`Snapshot`]: the whole state at one instant (immutable)
//! - [`Room`] / [`Bracket`]: one session and its tournament state
//! - [`Action`] + [`reduce`]: the pure, total transition function
//! - [`validate`]: why an action would be a no-op
//! - [`Store`]: serializes dispatches and notifies subscribers
//! - [`Rules`] / [`VotePolicy`]: tunables, such as vote deduplication

mod action;
mod bracket;
mod config;
mod error;
mod room;
mod snapshot;
mod store;

pub use action::{Action, apply, reduce, replay, validate};
pub use bracket::{Bracket, Entry, VoteRound};
pub use config::{Phase, Rules, UnknownVotePolicy, VotePolicy};
pub use error::RoomError;
pub use room::Room;
pub use snapshot::Snapshot;
pub use store::{Store, Subscription};
