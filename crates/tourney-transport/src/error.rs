use std::io;

/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("bind failed: {0}")]
    Bind(#[source] io::Error),

    #[error("accept failed: {0}")]
    Accept(#[source] io::Error),

    /// The WebSocket upgrade did not complete.
    #[error("handshake failed: {0}")]
    Handshake(String),

    #[error("send failed: {0}")]
    Send(#[source] io::Error),

    #[error("receive failed: {0}")]
    Receive(#[source] io::Error),

    /// A binary frame that is not valid UTF-8.
    #[error("invalid frame: {0}")]
    InvalidFrame(String),
}
