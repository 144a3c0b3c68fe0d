//! Frame struct and token decoding.
//!
//! A frame is one self-delimited unit of wire data. Its payload is a run of
//! NUL-terminated text fields; [`Frame::tokens`] splits it back into the
//! ordered field list.
//!
//! # Example
//!
//! ```
//! use tws_wire::protocol::Frame;
//! use bytes::Bytes;
//!
//! let frame = Frame::legacy(Bytes::from_static(b"176\x0020240101 10:00:00 EST\x00"));
//! assert_eq!(frame.tokens().unwrap(), vec!["176", "20240101 10:00:00 EST"]);
//! ```

use bytes::Bytes;

use super::wire_format::{encode_length, DELIMITER, LENGTH_HEADER_SIZE};
use crate::error::{Result, WireError};

/// A complete protocol frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Payload bytes (zero-copy via `bytes::Bytes`).
    pub payload: Bytes,
    /// Exact bytes this frame occupied on the wire, header included.
    pub raw: Bytes,
}

impl Frame {
    /// Create a legacy frame; the wire bytes are the payload itself.
    pub fn legacy(payload: Bytes) -> Self {
        Self {
            raw: payload.clone(),
            payload,
        }
    }

    /// Create a length-prefixed frame from its full wire bytes.
    ///
    /// `raw` must start with the 4-byte header.
    pub fn length_prefixed(raw: Bytes) -> Self {
        let payload = raw.slice(LENGTH_HEADER_SIZE.min(raw.len())..);
        Self { payload, raw }
    }

    /// Get a reference to the payload bytes.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Get the payload length.
    #[inline]
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    /// Split the payload into its ordered fields.
    ///
    /// A trailing empty element (the terminator) is dropped. An empty
    /// payload decodes to no tokens.
    pub fn tokens(&self) -> Result<Vec<String>> {
        decode_tokens(&self.payload)
    }
}

/// Split a NUL-delimited payload into tokens.
///
/// Fails if the payload is not valid UTF-8.
pub fn decode_tokens(payload: &[u8]) -> Result<Vec<String>> {
    let text = std::str::from_utf8(payload)
        .map_err(|e| WireError::Framing(format!("Payload is not valid UTF-8: {}", e)))?;

    let mut tokens: Vec<String> = text
        .split(char::from(DELIMITER))
        .map(str::to_owned)
        .collect();

    if tokens.last().is_some_and(|t| t.is_empty()) {
        tokens.pop();
    }

    Ok(tokens)
}

/// Build a length-prefixed frame as a single byte vector.
///
/// # Example
///
/// ```
/// use tws_wire::protocol::build_frame;
///
/// let bytes = build_frame(b"hi\0").unwrap();
/// assert_eq!(bytes, b"\0\0\0\x03hi\0");
/// ```
pub fn build_frame(payload: &[u8]) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(LENGTH_HEADER_SIZE + payload.len());
    buf.extend_from_slice(&encode_length(payload.len())?);
    buf.extend_from_slice(payload);
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_drop_terminator() {
        let frame = Frame::legacy(Bytes::from_static(b"4\x002\x00-1\x00"));
        assert_eq!(frame.tokens().unwrap(), vec!["4", "2", "-1"]);
    }

    #[test]
    fn test_tokens_keep_interior_empty_fields() {
        let frame = Frame::legacy(Bytes::from_static(b"a\x00\x00b\x00\x00"));
        assert_eq!(frame.tokens().unwrap(), vec!["a", "", "b", ""]);
    }

    #[test]
    fn test_tokens_without_terminator() {
        let frame = Frame::legacy(Bytes::from_static(b"a\x00b"));
        assert_eq!(frame.tokens().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_empty_payload_decodes_to_no_tokens() {
        let frame = Frame::legacy(Bytes::new());
        assert!(frame.tokens().unwrap().is_empty());
    }

    #[test]
    fn test_invalid_utf8_is_framing_error() {
        let frame = Frame::legacy(Bytes::from_static(&[0xff, 0xfe, 0x00]));
        let err = frame.tokens().unwrap_err();
        assert!(matches!(err, WireError::Framing(_)));
    }

    #[test]
    fn test_length_prefixed_frame_slices_payload() {
        let raw = Bytes::from(build_frame(b"1\x00").unwrap());
        let frame = Frame::length_prefixed(raw.clone());

        assert_eq!(frame.payload(), b"1\x00");
        assert_eq!(frame.raw, raw);
        // Payload shares the raw buffer.
        assert_eq!(frame.payload.as_ptr(), raw[LENGTH_HEADER_SIZE..].as_ptr());
    }

    #[test]
    fn test_build_frame_empty_payload() {
        let bytes = build_frame(b"").unwrap();
        assert_eq!(bytes, vec![0, 0, 0, 0]);
    }
}
