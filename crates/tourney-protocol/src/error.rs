//! Error types for the protocol layer.

/// Errors that can occur while turning frames into messages or back.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into a frame).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, missing required fields,
    /// or an unknown request `type`.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The frame decoded but is not acceptable at the protocol level,
    /// e.g. an empty participant name.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
