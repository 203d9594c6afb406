//! # Tourney
//!
//! Real-time voting rooms that settle a theme by single-elimination
//! bracket.
//!
//! Participants create or join a room, each submits one entry, and the
//! creator opens voting. Entries then meet in pairs; every round's winner
//! (or both, on a tie) goes to the back of the queue until one is left.
//! All state lives in one [`Store`](tourney_room::Store) and every change
//! is pushed to the room's connected clients as JSON over WebSocket.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tourney::prelude::*;
//!
//! # async fn run() -> Result<(), TourneyError> {
//! tourney::init_tracing();
//! let config = ServerConfig::from_env()?;
//! let server = TourneyServer::builder().config(&config).build().await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod registry;
mod server;

pub use config::{ConfigError, DEFAULT_BIND_ADDR, ServerConfig};
pub use error::TourneyError;
pub use registry::{Outgoing, StateView};
pub use server::{TourneyServer, TourneyServerBuilder};

pub use tourney_protocol as protocol;
pub use tourney_room as room;

use tracing_subscriber::EnvFilter;

/// Installs a `tracing` subscriber that writes to stderr, filtered by
/// `RUST_LOG` (default `info`).
///
/// Calling it twice is harmless; the second call does nothing.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub mod prelude {
    pub use crate::{ConfigError, ServerConfig, TourneyError, TourneyServer, TourneyServerBuilder};
    pub use tourney_protocol::{ClientRequest, ParticipantId, RoomId, ServerMessage};
    pub use tourney_room::{Action, Phase, Rules, Snapshot, Store, VotePolicy};
}
