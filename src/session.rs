//! Per-connection state.
//!
//! Everything that must start fresh on every connect lives in [`Session`],
//! and `connect()` replaces the whole value. Nothing is reset field by
//! field.

use crate::protocol::{FrameBuffer, ProtocolMode};

/// One-shot flags of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionFlags {
    /// The first inbound message (server version + time) is still due.
    pub awaiting_server: bool,
    /// Nothing has been sent yet on this connection.
    pub first_send: bool,
    /// An async request is waiting for its reply; the controller stays paused.
    pub awaiting_reply: bool,
}

impl SessionFlags {
    /// Flags of a connection that has not exchanged anything yet.
    pub fn fresh() -> Self {
        Self {
            awaiting_server: true,
            first_send: true,
            awaiting_reply: false,
        }
    }
}

impl Default for SessionFlags {
    fn default() -> Self {
        Self::fresh()
    }
}

/// Server identity captured from the first inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    /// Server protocol version.
    pub version: i32,
    /// Opaque connection time as sent by the server.
    pub connection_time: String,
}

/// Connection-scoped state owned by the socket.
#[derive(Debug)]
pub struct Session {
    /// One-shot flags.
    pub flags: SessionFlags,
    /// Reassembly buffer holding the pending fragment.
    pub frames: FrameBuffer,
    /// Server identity, once the handshake message has been seen.
    pub server: Option<ServerInfo>,
}

impl Session {
    /// Create a fresh session for `mode`.
    pub fn new(mode: ProtocolMode, max_payload_size: u32) -> Self {
        Self {
            flags: SessionFlags::fresh(),
            frames: FrameBuffer::with_max_payload(mode, max_payload_size),
            server: None,
        }
    }

    /// Framing mode of this session.
    pub fn mode(&self) -> ProtocolMode {
        self.frames.mode()
    }
}
