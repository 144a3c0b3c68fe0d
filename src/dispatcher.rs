//! Inbound message dispatch.
//!
//! Each complete frame goes through the same steps, in order:
//!
//! 1. decode the payload into tokens
//! 2. emit [`SocketEvent::Received`] with the tokens and the frame's wire bytes
//! 3. enqueue the tokens on the incoming queue
//! 4. on the first message of a connection, consume server version and
//!    connection time from the front of the queue and emit
//!    [`SocketEvent::Server`]
//! 5. run the queue's processing step
//! 6. if an async request is outstanding, clear it and resume the controller
//!
//! In legacy mode the handshake pair can straddle two chunks. The capture
//! then waits until both tokens are queued, and processing is held back
//! until it has happened.
//!
//! A message that fails (undecodable payload, unusable server version) is
//! reported and the rest of the chunk is still dispatched. Steps 5 and 6
//! run even after a failed handshake capture.

use crate::error::{Result, WireError};
use crate::events::{EventBus, SocketEvent};
use crate::flow::Controller;
use crate::protocol::Frame;
use crate::queue::IncomingQueue;
use crate::session::{ServerInfo, Session};

/// Routes decoded frames to the queue, the controller and subscribers.
pub struct Dispatcher;

impl Dispatcher {
    /// Dispatch frames in stream order.
    ///
    /// A failing frame is reported as [`SocketEvent::Error`] in its place in
    /// the event order, and the remaining frames are still dispatched.
    /// Returns the number of frames that failed.
    pub fn dispatch_all<C, Q>(
        frames: Vec<Frame>,
        session: &mut Session,
        queue: &mut Q,
        controller: &mut C,
        events: &mut EventBus,
    ) -> usize
    where
        C: Controller,
        Q: IncomingQueue,
    {
        let mut failed = 0;
        for frame in frames {
            if let Err(e) = Self::dispatch(frame, session, queue, controller, events) {
                tracing::error!("message dispatch failed: {}", e);
                events.emit(SocketEvent::Error(e));
                failed += 1;
            }
        }
        failed
    }

    /// Dispatch a single frame.
    ///
    /// An outstanding async request is released even if the frame fails:
    /// the gateway did answer.
    pub fn dispatch<C, Q>(
        frame: Frame,
        session: &mut Session,
        queue: &mut Q,
        controller: &mut C,
        events: &mut EventBus,
    ) -> Result<()>
    where
        C: Controller,
        Q: IncomingQueue,
    {
        let result = Self::deliver(&frame, session, queue, events);

        if session.flags.awaiting_reply {
            session.flags.awaiting_reply = false;
            controller.resume();
        }

        result
    }

    /// Decode, emit, enqueue, capture and process one frame.
    fn deliver<Q: IncomingQueue>(
        frame: &Frame,
        session: &mut Session,
        queue: &mut Q,
        events: &mut EventBus,
    ) -> Result<()> {
        let tokens = frame.tokens()?;
        tracing::debug!(fields = tokens.len(), bytes = frame.raw.len(), "received message");

        events.emit(SocketEvent::Received {
            tokens: tokens.clone(),
            raw: frame.raw.clone(),
        });

        queue.enqueue(tokens);

        let captured = if session.flags.awaiting_server {
            Self::capture_server(session, queue, events)
        } else {
            Ok(true)
        };

        // A rejected handshake is already consumed; the queue moves on.
        if !matches!(captured, Ok(false)) {
            queue.process();
        }

        captured.map(|_| ())
    }

    /// Consume the handshake pair. Returns `false` if it is not complete yet.
    fn capture_server<Q: IncomingQueue>(
        session: &mut Session,
        queue: &mut Q,
        events: &mut EventBus,
    ) -> Result<bool> {
        if queue.len() < 2 {
            tracing::debug!(queued = queue.len(), "server handshake incomplete, waiting");
            return Ok(false);
        }

        session.flags.awaiting_server = false;

        let raw_version = queue.dequeue().unwrap_or_default();
        let connection_time = queue.dequeue().unwrap_or_default();

        let version = parse_server_version(&raw_version)?;
        tracing::info!(version, connection_time = %connection_time, "server identified");

        session.server = Some(ServerInfo {
            version,
            connection_time: connection_time.clone(),
        });
        events.emit(SocketEvent::Server {
            version,
            connection_time,
        });

        Ok(true)
    }
}

/// Parse the server version token.
///
/// Surrounding whitespace is tolerated; anything else non-numeric fails.
pub fn parse_server_version(token: &str) -> Result<i32> {
    token
        .trim()
        .parse::<i32>()
        .map_err(|_| WireError::Handshake(format!("Invalid server version {:?}", token)))
}
