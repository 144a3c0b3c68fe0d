//! # tws-wire
//!
//! Client-side wire protocol for TWS-style trading gateways.
//!
//! The gateway speaks NUL-delimited text fields in one of two generations:
//!
//! - **Legacy**: fields terminated by NUL, no message boundaries
//! - **V100+**: the same payloads behind a 4-byte big-endian length,
//!   negotiated with an unframed `"API\0"` string on connect
//!
//! ## Architecture
//!
//! - **Protocol** ([`protocol`]): length headers, frames, stream reassembly
//! - **Codec** ([`codec`]): outbound values to wire bytes
//! - **Socket** ([`socket`]): sans-IO coordinator for connect, handshake,
//!   send, dispatch and flow control
//! - **Transport** ([`transport`]): tokio TCP underneath
//! - **Client** ([`Client`]): async driver that ties it all together
//!
//! ## Example
//!
//! ```ignore
//! use std::time::Duration;
//! use tws_wire::{msg, Client};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), tws_wire::WireError> {
//!     let mut client = Client::builder().port(7497).client_id(1).build()?;
//!
//!     client.run_until_connected(Duration::from_secs(5)).await?;
//!     client.wait_server(Duration::from_secs(5)).await?;
//!
//!     client.send(msg![71, 2, 1, ""])?;
//!     client.run_until_closed().await
//! }
//! ```

pub mod codec;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod flow;
pub mod protocol;
pub mod queue;
pub mod session;
pub mod socket;
pub mod transport;

mod client;
mod writer;

pub use client::{Client, ClientBuilder};
pub use codec::{Message, Value};
pub use config::SocketConfig;
pub use error::{Result, WireError};
pub use events::SocketEvent;
pub use flow::{Controller, FlowGate};
pub use protocol::ProtocolMode;
pub use queue::{IncomingQueue, TokenQueue};
pub use socket::{ConnectionState, Socket};
