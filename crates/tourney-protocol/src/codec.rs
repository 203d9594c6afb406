//! Codec trait and implementations for serializing/deserializing messages.
//!
//! A "codec" converts between Rust types and the text frames carried by
//! the transport. The server doesn't care HOW messages are serialized,
//! only that something implements [`Codec`].
//!
//! Browser clients speak JSON, so [`JsonCodec`] is the one we ship.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// A codec that can encode Rust types to text frames and decode them back.
///
/// `Send + Sync + 'static` because one codec instance is shared by every
/// connection task for the lifetime of the server.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into a text frame.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError>;

    /// Deserializes a text frame back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the frame is malformed or
    /// doesn't match the expected type.
    fn decode<T: DeserializeOwned>(&self, frame: &str) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// This is behind the `json` feature flag (enabled by default).
///
/// ## Example
///
/// ```rust
/// use tourney_protocol::{ClientRequest, Codec, JsonCodec};
///
/// let codec = JsonCodec;
/// let req: ClientRequest = codec.decode(r#"{"type":"next"}"#).unwrap();
/// assert_eq!(req, ClientRequest::Next);
///
/// let frame = codec.encode(&req).unwrap();
/// assert_eq!(frame, r#"{"type":"next"}"#);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError> {
        serde_json::to_string(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, frame: &str) -> Result<T, ProtocolError> {
        serde_json::from_str(frame).map_err(ProtocolError::Decode)
    }
}
