//! Error types for tws-wire.

use thiserror::Error;

/// Main error type for all socket operations.
#[derive(Debug, Error)]
pub enum WireError {
    /// I/O error during socket operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON deserialization error (configuration only).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration.
    #[error("Config error: {0}")]
    Config(String),

    /// Transport-level failure (refused, reset, task gone).
    #[error("Transport error: {0}")]
    Transport(String),

    /// Framing error (bad length header, undecodable payload).
    ///
    /// The stream is considered corrupt after this.
    #[error("Framing error: {0}")]
    Framing(String),

    /// The first inbound message did not carry a usable server version.
    #[error("Handshake error: {0}")]
    Handshake(String),

    /// Operation requires a connected socket.
    #[error("Not connected")]
    NotConnected,

    /// `connect()` called while connecting or connected.
    #[error("Already connected")]
    AlreadyConnected,

    /// Controller stayed paused past the wait deadline.
    #[error("Timed out waiting for resume")]
    ResumeTimeout,

    /// A client wait did not complete in time.
    #[error("Timed out waiting for {0}")]
    Timeout(&'static str),

    /// Connection closed unexpectedly.
    #[error("Connection closed")]
    ConnectionClosed,
}

/// Result type alias using WireError.
pub type Result<T> = std::result::Result<T, WireError>;
