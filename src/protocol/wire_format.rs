//! Wire format constants and length header encoding.
//!
//! Two protocol generations share one field delimiter (NUL):
//!
//! ```text
//! Legacy:    field NUL field NUL ... field NUL
//!
//! V100+:     ┌──────────────┬──────────────────────────────────┐
//!            │ Length       │ Payload                          │
//!            │ 4 bytes      │ field NUL field NUL ... NUL      │
//!            │ uint32 BE    │ exactly `Length` bytes           │
//!            └──────────────┴──────────────────────────────────┘
//! ```
//!
//! A V100+ connection opens with an unframed negotiation string:
//! `"API\0"`, a 4-byte zero field, one length byte, then the version range.

use serde::Deserialize;

use crate::error::{Result, WireError};

/// Field separator and message terminator in both generations.
pub const DELIMITER: u8 = 0;

/// Length header size in bytes (V100+ only).
pub const LENGTH_HEADER_SIZE: usize = 4;

/// Default maximum payload size accepted from the gateway (16 MB).
pub const DEFAULT_MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;

/// Literal prefix of the V100+ negotiation string.
pub const NEGOTIATION_PREFIX: &str = "API\0\0\0\0";

/// Lowest protocol version offered during V100+ negotiation.
pub const MIN_CLIENT_VERSION: u32 = 100;

/// Highest protocol version offered during V100+ negotiation.
pub const MAX_CLIENT_VERSION: u32 = 106;

/// Wire encoding used for the lifetime of one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolMode {
    /// Delimiter-only framing, no length header.
    Legacy,
    /// Length-prefixed framing, negotiated with an unframed handshake string.
    #[default]
    #[serde(alias = "v100")]
    LengthPrefixed,
}

impl ProtocolMode {
    /// Check if this mode uses length headers.
    #[inline]
    pub fn is_length_prefixed(self) -> bool {
        matches!(self, ProtocolMode::LengthPrefixed)
    }
}

/// Encode a payload length as a big-endian header.
///
/// Fails if the payload does not fit a `u32`.
pub fn encode_length(len: usize) -> Result<[u8; LENGTH_HEADER_SIZE]> {
    let len = u32::try_from(len)
        .map_err(|_| WireError::Framing(format!("Payload size {} exceeds u32", len)))?;
    Ok(len.to_be_bytes())
}

/// Decode a big-endian length header.
///
/// Returns `None` if fewer than 4 bytes are available.
///
/// # Example
///
/// ```
/// use tws_wire::protocol::decode_length;
///
/// assert_eq!(decode_length(&[0, 0, 1, 0]), Some(256));
/// assert_eq!(decode_length(&[0, 0, 1]), None);
/// ```
pub fn decode_length(buf: &[u8]) -> Option<u32> {
    if buf.len() < LENGTH_HEADER_SIZE {
        return None;
    }
    Some(u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]))
}

/// Validate a declared payload length against the configured maximum.
pub fn validate_length(len: u32, max_payload_size: u32) -> Result<()> {
    if len > max_payload_size {
        return Err(WireError::Framing(format!(
            "Payload size {} exceeds maximum {}",
            len, max_payload_size
        )));
    }
    Ok(())
}

/// Build the V100+ negotiation string for a version range.
///
/// # Example
///
/// ```
/// use tws_wire::protocol::build_negotiation;
///
/// assert_eq!(build_negotiation(100, 106), "API\0\0\0\0\tv100..106");
/// ```
pub fn build_negotiation(min_version: u32, max_version: u32) -> String {
    let range = format!("v{}..{}", min_version, max_version);
    let mut out = String::with_capacity(NEGOTIATION_PREFIX.len() + 1 + range.len());
    out.push_str(NEGOTIATION_PREFIX);
    // Two u32 bounds give at most 23 bytes, so the length is one ASCII byte.
    out.push(char::from(range.len() as u8));
    out.push_str(&range);
    out
}
