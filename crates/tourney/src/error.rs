//! Unified error type for the Tourney server.

use tourney_protocol::ProtocolError;
use tourney_room::RoomError;
use tourney_transport::TransportError;

use crate::ConfigError;

/// Top-level error that wraps every crate-specific error, so `?` works
/// across layers.
#[derive(Debug, thiserror::Error)]
pub enum TourneyError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Room(#[from] RoomError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use tourney_protocol::RoomId;

    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err: TourneyError = TransportError::InvalidFrame("bad utf-8".into()).into();
        assert!(matches!(err, TourneyError::Transport(_)));
        assert!(err.to_string().contains("bad utf-8"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err: TourneyError = ProtocolError::InvalidMessage("bad".into()).into();
        assert!(matches!(err, TourneyError::Protocol(_)));
    }

    #[test]
    fn test_from_room_error_keeps_message() {
        let err: TourneyError = RoomError::NotFound(RoomId::new("abc")).into();
        assert!(matches!(err, TourneyError::Room(_)));
        assert_eq!(err.to_string(), "room abc not found");
    }

    #[test]
    fn test_from_config_error() {
        let err: TourneyError = ConfigError::InvalidPort {
            name: "PORT",
            value: "x".into(),
        }
        .into();
        assert!(matches!(err, TourneyError::Config(_)));
    }
}
