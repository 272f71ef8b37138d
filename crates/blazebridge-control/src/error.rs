//! Error types for the device client
use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Device client errors
///
/// A request that simply gets no reply is not an error: those calls return
/// `Ok(None)` (or an incomplete catalog) once their timeout elapses.
#[derive(Error, Debug)]
pub enum ControlError {
    /// The connection was closed, either by the device or by a transport
    /// failure. Every later call on the same client fails with this as well.
    #[error("Connection to Pixelblaze is closed")]
    ConnectionClosed,

    /// Opening the connection did not complete in time
    #[error("Timed out connecting to {0}")]
    ConnectTimeout(String),

    /// A well-formed frame whose content could not be decoded
    #[error("Malformed reply: {0}")]
    MalformedReply(String),

    /// A send failed but the connection is still usable
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),
}

impl ControlError {
    /// Whether the error means the client can no longer be used
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ConnectionClosed)
    }
}

/// Result type for device operations
pub type Result<T> = std::result::Result<T, ControlError>;
