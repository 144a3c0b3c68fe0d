//! Protocol module - wire format, framing, and frame types.
//!
//! This module implements both framing generations of the gateway socket:
//! - Legacy NUL-delimited text
//! - V100+ 4-byte length-prefixed frames and the negotiation string
//! - Frame buffer for accumulating partial reads

mod frame;
mod frame_buffer;
mod wire_format;

#[cfg(test)]
mod proptests;

pub use frame::{build_frame, decode_tokens, Frame};
pub use frame_buffer::FrameBuffer;
pub use wire_format::{
    build_negotiation, decode_length, encode_length, validate_length, ProtocolMode,
    DEFAULT_MAX_PAYLOAD_SIZE, DELIMITER, LENGTH_HEADER_SIZE, MAX_CLIENT_VERSION,
    MIN_CLIENT_VERSION, NEGOTIATION_PREFIX,
};
