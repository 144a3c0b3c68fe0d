//! Transport module - the byte pipe underneath the socket.
//!
//! The socket core is I/O-free. It drives a [`Transport`] through three
//! commands and is driven back by [`TransportEvent`]s, which the owner of
//! the event loop feeds into [`Socket::handle_event`](crate::socket::Socket::handle_event)
//! one at a time.
//!
//! - [`TcpTransport`] - tokio TCP implementation

mod tcp;

use bytes::Bytes;

use crate::error::Result;

pub use tcp::TcpTransport;

/// Commands the socket issues to its transport.
pub trait Transport {
    /// Start connecting. Completion is reported as [`TransportEvent::Established`].
    fn connect(&mut self, host: &str, port: u16) -> Result<()>;

    /// Queue bytes for writing.
    fn write(&mut self, data: Bytes) -> Result<()>;

    /// Start a graceful close. Completion is reported as
    /// [`TransportEvent::End`] or [`TransportEvent::Close`].
    fn close(&mut self) -> Result<()>;
}

/// Notifications from the transport.
#[derive(Debug)]
pub enum TransportEvent {
    /// Connection established.
    Established,
    /// Bytes arrived. No framing guarantee.
    Data(Bytes),
    /// Peer finished sending.
    End,
    /// Connection closed.
    Close,
    /// I/O failure. A closure event follows separately.
    Error(std::io::Error),
}
