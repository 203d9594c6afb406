//! Wire protocol for Tourney.
//!
//! This crate defines the "language" that clients and the server speak:
//!
//! - **Identities** ([`RoomId`], [`ParticipantId`]) shared by every layer.
//! - **Messages** ([`ClientRequest`], [`ServerMessage`]) that travel as
//!   JSON text frames.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) that converts messages
//!   to and from frames.
//! - **Errors** ([`ProtocolError`]).
//!
//! ```text
//! Transport (text frames) → Protocol (ClientRequest) → Room (Action)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{ClientRequest, ParticipantId, RoomId, ServerMessage};
