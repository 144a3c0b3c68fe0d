//! Socket notifications and the subscriber registry.
//!
//! Emission is synchronous: [`EventBus::emit`] calls every subscriber in
//! registration order before returning, so the event order seen by any
//! subscriber is the order the socket produced them in.
//!
//! # Example
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use tws_wire::events::{EventBus, SocketEvent};
//!
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = seen.clone();
//!
//! let mut bus = EventBus::new();
//! bus.subscribe(move |event| sink.lock().unwrap().push(event.name()));
//! bus.emit(SocketEvent::Connected);
//!
//! assert_eq!(*seen.lock().unwrap(), vec!["connected"]);
//! ```

use bytes::Bytes;

use crate::error::WireError;

/// Notification emitted by the socket.
#[derive(Debug)]
pub enum SocketEvent {
    /// Transport established.
    Connected,
    /// Transport closed after having been connected.
    Disconnected,
    /// Server identified itself in the first inbound message.
    Server {
        /// Negotiated server version.
        version: i32,
        /// Opaque server connection time.
        connection_time: String,
    },
    /// A complete inbound message was decoded.
    Received {
        /// Decoded fields in wire order.
        tokens: Vec<String>,
        /// Wire bytes of the frame the tokens came from.
        raw: Bytes,
    },
    /// An outbound message was written.
    Sent {
        /// Stringified fields as handed to the codec.
        tokens: Vec<String>,
        /// Encoded wire bytes.
        data: Bytes,
    },
    /// Transport, framing, or handshake failure.
    Error(WireError),
}

impl SocketEvent {
    /// Short lowercase event name.
    pub fn name(&self) -> &'static str {
        match self {
            SocketEvent::Connected => "connected",
            SocketEvent::Disconnected => "disconnected",
            SocketEvent::Server { .. } => "server",
            SocketEvent::Received { .. } => "received",
            SocketEvent::Sent { .. } => "sent",
            SocketEvent::Error(_) => "error",
        }
    }
}

/// Identifier returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&SocketEvent) + Send + 'static>;

/// Registry of event subscribers.
#[derive(Default)]
pub struct EventBus {
    listeners: Vec<(SubscriptionId, Listener)>,
    next_id: u64,
}

impl EventBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber.
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&SocketEvent) + Send + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a subscriber. Returns `false` if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    /// Number of registered subscribers.
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Check if there are no subscribers.
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Deliver an event to every subscriber.
    pub fn emit(&mut self, event: SocketEvent) {
        tracing::trace!(event = event.name(), "emit");
        for (_, listener) in self.listeners.iter_mut() {
            listener(&event);
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
