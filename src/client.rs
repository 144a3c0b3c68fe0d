//! Client builder and runtime loop.
//!
//! The [`ClientBuilder`] provides a fluent API for configuring the
//! connection and building the client. The [`Client`] pairs a [`Socket`]
//! with a [`TcpTransport`] and serializes the transport's events into it:
//!
//! 1. `connect()` opens the TCP connection
//! 2. the handshake goes out as soon as it is established
//! 3. every read is reassembled and dispatched in arrival order
//! 4. the socket returns to `Disconnected` when the gateway closes
//!
//! Nothing runs in the background besides the transport's I/O tasks; the
//! socket only advances while one of the `run_*` / `wait_*` methods (or
//! [`Client::next_event`]) is being awaited.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use tws_wire::{msg, Client};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = Client::builder()
//!         .host("127.0.0.1")
//!         .port(7497)
//!         .client_id(1)
//!         .processor(|tokens| {
//!             println!("incoming: {:?}", tokens.drain(..).collect::<Vec<_>>());
//!         })
//!         .build()?;
//!
//!     client.run_until_connected(Duration::from_secs(5)).await?;
//!     let version = client.wait_server(Duration::from_secs(5)).await?;
//!     println!("server version {}", version);
//!
//!     client.send_async(msg![49, 1])?;
//!     client.wait_reply(Duration::from_secs(5)).await?;
//!
//!     client.disconnect()?;
//!     client.run_until_closed().await?;
//!     Ok(())
//! }
//! ```

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::codec::Message;
use crate::config::SocketConfig;
use crate::error::{Result, WireError};
use crate::events::{SocketEvent, SubscriptionId};
use crate::flow::FlowGate;
use crate::protocol::ProtocolMode;
use crate::queue::{IncomingQueue, Processor, TokenQueue};
use crate::socket::{ConnectionState, Socket};
use crate::transport::{TcpTransport, TransportEvent};

/// Builder for configuring and creating a client.
///
/// Use the fluent API to describe the gateway and the client identity,
/// then call `build()`.
pub struct ClientBuilder {
    config: SocketConfig,
    processor: Option<Processor>,
}

impl ClientBuilder {
    /// Create a builder with default settings.
    pub fn new() -> Self {
        Self {
            config: SocketConfig::default(),
            processor: None,
        }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: SocketConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the gateway host.
    ///
    /// Default: 127.0.0.1
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set the gateway port.
    ///
    /// Default: 7496
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the client id announced in the handshake.
    pub fn client_id(mut self, client_id: i32) -> Self {
        self.config.client_id = client_id;
        self
    }

    /// Set the wire generation.
    ///
    /// Default: length-prefixed (V100+)
    pub fn mode(mut self, mode: ProtocolMode) -> Self {
        self.config.mode = mode;
        self
    }

    /// Set the optional capabilities string (V100+ only).
    pub fn optional_capabilities(mut self, capabilities: impl Into<String>) -> Self {
        self.config.optional_capabilities = capabilities.into();
        self
    }

    /// Set the version range offered during V100+ negotiation.
    pub fn version_range(mut self, min: u32, max: u32) -> Self {
        self.config.min_version = min;
        self.config.max_version = max;
        self
    }

    /// Set the largest inbound payload accepted.
    ///
    /// Default: 16 MB
    pub fn max_payload_size(mut self, size: u32) -> Self {
        self.config.max_payload_size = size;
        self
    }

    /// Set the processing step run on the incoming token queue.
    ///
    /// It receives the whole queue and consumes what it recognises.
    pub fn processor<F>(mut self, processor: F) -> Self
    where
        F: FnMut(&mut VecDeque<String>) + Send + 'static,
    {
        self.processor = Some(Box::new(processor));
        self
    }

    /// Validate the configuration and build a client with a [`TokenQueue`].
    pub fn build(mut self) -> Result<Client> {
        let queue = match self.processor.take() {
            Some(processor) => TokenQueue::with_processor(processor),
            None => TokenQueue::new(),
        };
        self.build_with_queue(queue)
    }

    /// Validate the configuration and build a client around `queue`.
    ///
    /// A processor set on the builder is ignored.
    pub fn build_with_queue<Q: IncomingQueue>(self, queue: Q) -> Result<Client<Q>> {
        self.config.validate()?;

        let (transport, events) = TcpTransport::channel();
        let gate = FlowGate::new();
        let socket = Socket::new(self.config, transport, gate.clone(), queue);

        Ok(Client {
            socket,
            events,
            gate,
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A gateway client over TCP.
pub struct Client<Q = TokenQueue> {
    /// The coordinator.
    socket: Socket<TcpTransport, FlowGate, Q>,
    /// Transport notifications, in arrival order.
    events: mpsc::UnboundedReceiver<TransportEvent>,
    /// Shared view of the socket's controller.
    gate: FlowGate,
}

impl Client {
    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }
}

impl<Q: IncomingQueue> Client<Q> {
    /// Start connecting. Use [`Client::run_until_connected`] to also wait.
    pub fn connect(&mut self) -> Result<()> {
        self.socket.connect()
    }

    /// Start a graceful close.
    pub fn disconnect(&mut self) -> Result<()> {
        self.socket.disconnect()
    }

    /// Send a message.
    pub fn send<M: Into<Message>>(&mut self, message: M) -> Result<()> {
        self.socket.send(message, false)
    }

    /// Send a message and hold the gate closed until the next inbound message.
    pub fn send_async<M: Into<Message>>(&mut self, message: M) -> Result<()> {
        self.socket.send(message, true)
    }

    /// Register an event subscriber.
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&SocketEvent) + Send + 'static,
    {
        self.socket.subscribe(listener)
    }

    /// Remove an event subscriber.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.socket.unsubscribe(id)
    }

    /// Handle on the flow gate, for request producers.
    pub fn gate(&self) -> FlowGate {
        self.gate.clone()
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.socket.state()
    }

    /// The underlying socket.
    pub fn socket(&self) -> &Socket<TcpTransport, FlowGate, Q> {
        &self.socket
    }

    /// Mutable access to the underlying socket.
    pub fn socket_mut(&mut self) -> &mut Socket<TcpTransport, FlowGate, Q> {
        &mut self.socket
    }

    /// Wait for one transport notification and feed it to the socket.
    pub async fn next_event(&mut self) -> Result<()> {
        let event = self.events.recv().await.ok_or(WireError::ConnectionClosed)?;
        tracing::trace!(?event, "transport event");
        self.socket.handle_event(event);
        Ok(())
    }

    /// Connect and wait until the transport is established.
    ///
    /// The handshake has been sent when this returns.
    pub async fn run_until_connected(&mut self, timeout: Duration) -> Result<()> {
        self.socket.connect()?;
        self.drive("connection", timeout, |s| s.state() != ConnectionState::Connecting)
            .await?;

        if !self.socket.is_connected() {
            return Err(WireError::Transport(format!(
                "could not connect to {}:{}",
                self.socket.config().host,
                self.socket.config().port
            )));
        }
        Ok(())
    }

    /// Wait for the server handshake message. Returns the server version.
    pub async fn wait_server(&mut self, timeout: Duration) -> Result<i32> {
        self.drive("server version", timeout, |s| {
            s.server_version().is_some() || s.state() == ConnectionState::Disconnected
        })
        .await?;

        self.socket
            .server_version()
            .ok_or(WireError::ConnectionClosed)
    }

    /// Wait until the outstanding async request has been answered.
    pub async fn wait_reply(&mut self, timeout: Duration) -> Result<()> {
        self.drive("reply", timeout, |s| {
            !s.flags().awaiting_reply || s.state() == ConnectionState::Disconnected
        })
        .await?;

        if self.socket.flags().awaiting_reply {
            return Err(WireError::ConnectionClosed);
        }
        Ok(())
    }

    /// Process notifications until the connection is closed.
    pub async fn run_until_closed(&mut self) -> Result<()> {
        while self.socket.state() != ConnectionState::Disconnected {
            self.next_event().await?;
        }
        tracing::debug!("event loop finished");
        Ok(())
    }

    async fn drive<F>(&mut self, what: &'static str, timeout: Duration, done: F) -> Result<()>
    where
        F: Fn(&Socket<TcpTransport, FlowGate, Q>) -> bool,
    {
        let wait = async {
            while !done(&self.socket) {
                self.next_event().await?;
            }
            Ok::<(), WireError>(())
        };

        match tokio::time::timeout(timeout, wait).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(what, "timed out");
                Err(WireError::Timeout(what))
            }
        }
    }
}
