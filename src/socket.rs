//! Connection and flow coordinator.
//!
//! [`Socket`] owns the connection state machine and glues the pieces
//! together:
//!
//! ```text
//!              connect()                 Established
//! Disconnected ─────────► Connecting ──────────────► Connected
//!      ▲                      │                          │
//!      └──────── End / Close ─┴──────────────────────────┘
//! ```
//!
//! It performs no I/O itself. Commands go out through the injected
//! [`Transport`], and the event loop feeds transport notifications back in
//! with [`Socket::handle_event`]. All calls are expected to be serialized by
//! that loop; nothing here locks.
//!
//! Flow control follows the connection lifecycle:
//!
//! - `connect()` and `disconnect()` pause the controller
//! - the handshake, and every closure, resume it
//! - an async send pauses it until the next inbound message arrives

use bytes::Bytes;

use crate::codec::{Message, TokenCodec};
use crate::config::SocketConfig;
use crate::dispatcher::Dispatcher;
use crate::error::{Result, WireError};
use crate::events::{EventBus, SocketEvent, SubscriptionId};
use crate::flow::Controller;
use crate::protocol::ProtocolMode;
use crate::queue::IncomingQueue;
use crate::session::{Session, SessionFlags};
use crate::transport::{Transport, TransportEvent};

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection.
    Disconnected,
    /// Transport opening.
    Connecting,
    /// Transport established.
    Connected,
}

/// Socket over an injected transport, controller and incoming queue.
#[derive(Debug)]
pub struct Socket<T, C, Q> {
    config: SocketConfig,
    transport: T,
    controller: C,
    queue: Q,
    events: EventBus,
    state: ConnectionState,
    session: Session,
}

impl<T, C, Q> Socket<T, C, Q>
where
    T: Transport,
    C: Controller,
    Q: IncomingQueue,
{
    /// Create a disconnected socket.
    pub fn new(config: SocketConfig, transport: T, controller: C, queue: Q) -> Self {
        let session = Session::new(config.mode, config.max_payload_size);
        Self {
            config,
            transport,
            controller,
            queue,
            events: EventBus::new(),
            state: ConnectionState::Disconnected,
            session,
        }
    }

    /// Start connecting to the configured gateway.
    ///
    /// The controller stays paused until the handshake has been sent.
    pub fn connect(&mut self) -> Result<()> {
        if self.state != ConnectionState::Disconnected {
            return Err(WireError::AlreadyConnected);
        }

        self.controller.pause();
        self.session = Session::new(self.config.mode, self.config.max_payload_size);
        self.state = ConnectionState::Connecting;

        tracing::info!(
            host = %self.config.host,
            port = self.config.port,
            mode = ?self.config.mode,
            "connecting"
        );

        if let Err(e) = self.transport.connect(&self.config.host, self.config.port) {
            self.state = ConnectionState::Disconnected;
            self.controller.resume();
            return Err(e);
        }
        Ok(())
    }

    /// Start a graceful close.
    ///
    /// The state only changes once the transport reports the closure.
    pub fn disconnect(&mut self) -> Result<()> {
        if self.state == ConnectionState::Disconnected {
            return Err(WireError::NotConnected);
        }

        tracing::info!("disconnecting");
        self.controller.pause();
        self.transport.close()
    }

    /// Encode and write one message.
    ///
    /// With `is_async`, the controller is paused before writing and stays
    /// paused until the next inbound message is dispatched.
    pub fn send<M: Into<Message>>(&mut self, message: M, is_async: bool) -> Result<()> {
        if self.state != ConnectionState::Connected {
            return Err(WireError::NotConnected);
        }

        if is_async {
            self.session.flags.awaiting_reply = true;
            self.controller.pause();
        }

        match self.write_message(message.into()) {
            Ok(()) => Ok(()),
            Err(e) => {
                // No reply can follow a message that never left.
                if is_async && self.session.flags.awaiting_reply {
                    self.session.flags.awaiting_reply = false;
                    self.controller.resume();
                }
                Err(e)
            }
        }
    }

    fn write_message(&mut self, message: Message) -> Result<()> {
        let fields = message.fields();
        let data = TokenCodec::encode(self.config.mode, self.session.flags.first_send, &fields)?;

        self.transport.write(data.clone())?;
        tracing::debug!(fields = fields.len(), bytes = data.len(), "sent message");

        self.events.emit(SocketEvent::Sent {
            tokens: fields,
            data,
        });
        self.session.flags.first_send = false;
        Ok(())
    }

    /// Feed one transport notification.
    ///
    /// Failures while handling it are reported as [`SocketEvent::Error`].
    pub fn handle_event(&mut self, event: TransportEvent) {
        let result = match event {
            TransportEvent::Established => self.on_established(),
            TransportEvent::Data(data) => self.on_data(&data),
            TransportEvent::End | TransportEvent::Close => {
                self.on_closed();
                Ok(())
            }
            TransportEvent::Error(e) => Err(WireError::Io(e)),
        };

        if let Err(e) = result {
            self.on_error(e);
        }
    }

    /// Feed a data chunk, reporting failures as events.
    pub fn receive(&mut self, data: Bytes) {
        self.handle_event(TransportEvent::Data(data));
    }

    /// Transport established: send the handshake and release the controller.
    pub fn on_established(&mut self) -> Result<()> {
        if self.state != ConnectionState::Connecting {
            tracing::warn!(state = ?self.state, "unexpected established notification");
            return Ok(());
        }

        self.state = ConnectionState::Connected;
        tracing::info!(host = %self.config.host, port = self.config.port, "connected");
        self.events.emit(SocketEvent::Connected);

        let mut result = Ok(());
        for message in self.config.handshake_messages() {
            result = self.write_message(message);
            if result.is_err() {
                break;
            }
        }

        self.controller.resume();
        result
    }

    /// Bytes arrived: reassemble and dispatch every complete message.
    ///
    /// Fails only if the stream itself is unusable. Messages that fail on
    /// their own are reported in order by the dispatcher.
    pub fn on_data(&mut self, data: &[u8]) -> Result<()> {
        let frames = self.session.frames.push(data)?;
        if frames.is_empty() {
            tracing::trace!(pending = self.session.frames.len(), "partial message buffered");
            return Ok(());
        }

        let failed = Dispatcher::dispatch_all(
            frames,
            &mut self.session,
            &mut self.queue,
            &mut self.controller,
            &mut self.events,
        );
        if failed > 0 {
            tracing::warn!(failed, "chunk contained failed messages");
        }
        Ok(())
    }

    /// Transport closed or ended.
    pub fn on_closed(&mut self) {
        if self.state == ConnectionState::Disconnected {
            return;
        }

        let was_connected = self.state == ConnectionState::Connected;
        self.state = ConnectionState::Disconnected;

        if was_connected {
            tracing::info!("disconnected");
            self.events.emit(SocketEvent::Disconnected);
        }
        self.controller.resume();
    }

    /// Report a failure. The state is left to the transport's closure event.
    pub fn on_error(&mut self, error: WireError) {
        tracing::error!("socket error: {}", error);
        self.events.emit(SocketEvent::Error(error));
    }
}

impl<T, C, Q> Socket<T, C, Q> {
    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Check if the socket is connected.
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Configuration in use.
    pub fn config(&self) -> &SocketConfig {
        &self.config
    }

    /// Wire generation in use.
    pub fn mode(&self) -> ProtocolMode {
        self.config.mode
    }

    /// One-shot flags of the current connection.
    pub fn flags(&self) -> SessionFlags {
        self.session.flags
    }

    /// Server version of the current connection, once received.
    pub fn server_version(&self) -> Option<i32> {
        self.session.server.as_ref().map(|s| s.version)
    }

    /// Server connection time of the current connection, once received.
    pub fn server_connection_time(&self) -> Option<&str> {
        self.session
            .server
            .as_ref()
            .map(|s| s.connection_time.as_str())
    }

    /// Register an event subscriber.
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&SocketEvent) + Send + 'static,
    {
        self.events.subscribe(listener)
    }

    /// Remove an event subscriber.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// The controller.
    pub fn controller(&self) -> &C {
        &self.controller
    }

    /// The incoming queue.
    pub fn queue(&self) -> &Q {
        &self.queue
    }

    /// Mutable access to the incoming queue.
    pub fn queue_mut(&mut self) -> &mut Q {
        &mut self.queue
    }

    /// The transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutable access to the transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}
