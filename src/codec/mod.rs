//! Codec module - outbound values and their wire encoding.
//!
//! - [`Value`] / [`Message`] - what callers send, and how each value is
//!   stringified into a field
//! - [`TokenCodec`] - fields to wire bytes in either protocol generation
//!
//! # Design
//!
//! The codec is a marker struct with static methods rather than a trait
//! object; the protocol mode is passed per call and never stored here.
//!
//! # Example
//!
//! ```
//! use tws_wire::codec::TokenCodec;
//! use tws_wire::msg;
//! use tws_wire::protocol::{decode_tokens, ProtocolMode};
//!
//! let fields = msg![62, 1, true].fields();
//! let wire = TokenCodec::encode(ProtocolMode::Legacy, false, &fields).unwrap();
//! assert_eq!(decode_tokens(&wire).unwrap(), vec!["62", "1", "1"]);
//! ```

mod token;
mod value;

pub use token::TokenCodec;
pub use value::{Message, Value};
