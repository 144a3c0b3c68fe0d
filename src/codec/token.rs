//! Token codec - fields to wire bytes.
//!
//! Outbound encoding in both generations:
//!
//! - **Legacy**: `field NUL field NUL ... NUL`
//! - **V100+**: the same payload behind a 4-byte big-endian length, except
//!   the first send of a connection, which is the negotiation string sent
//!   verbatim (no terminator, no header).
//!
//! # Example
//!
//! ```
//! use tws_wire::codec::TokenCodec;
//! use tws_wire::protocol::ProtocolMode;
//!
//! let fields = vec!["76".to_string()];
//! let wire = TokenCodec::encode(ProtocolMode::Legacy, false, &fields).unwrap();
//! assert_eq!(&wire[..], b"76\0");
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::Result;
use crate::protocol::{encode_length, ProtocolMode, DELIMITER, LENGTH_HEADER_SIZE};

/// Token codec for outbound messages.
pub struct TokenCodec;

impl TokenCodec {
    /// Join fields with the delimiter and terminate the last one.
    ///
    /// An empty field list yields an empty payload, which decodes back to
    /// no tokens.
    pub fn encode_payload(fields: &[String]) -> Vec<u8> {
        if fields.is_empty() {
            return Vec::new();
        }
        let size = fields.iter().map(|f| f.len() + 1).sum::<usize>();
        let mut buf = Vec::with_capacity(size);
        for (i, field) in fields.iter().enumerate() {
            if i > 0 {
                buf.push(DELIMITER);
            }
            buf.extend_from_slice(field.as_bytes());
        }
        buf.push(DELIMITER);
        buf
    }

    /// Encode fields for the wire.
    ///
    /// `first_send` is only consulted in length-prefixed mode, where it
    /// selects the bare negotiation encoding (the first field, verbatim).
    pub fn encode(mode: ProtocolMode, first_send: bool, fields: &[String]) -> Result<Bytes> {
        match mode {
            ProtocolMode::Legacy => Ok(Bytes::from(Self::encode_payload(fields))),
            ProtocolMode::LengthPrefixed if first_send => Ok(Self::encode_bare(fields)),
            ProtocolMode::LengthPrefixed => Self::encode_length_prefixed(fields),
        }
    }

    /// Encode a V100+ frame: header plus terminated payload.
    pub fn encode_length_prefixed(fields: &[String]) -> Result<Bytes> {
        let payload = Self::encode_payload(fields);
        let mut buf = BytesMut::with_capacity(LENGTH_HEADER_SIZE + payload.len());
        buf.put_slice(&encode_length(payload.len())?);
        buf.put_slice(&payload);
        Ok(buf.freeze())
    }

    /// Encode the unframed negotiation send.
    pub fn encode_bare(fields: &[String]) -> Bytes {
        fields
            .first()
            .map(|f| Bytes::copy_from_slice(f.as_bytes()))
            .unwrap_or_default()
    }
}
