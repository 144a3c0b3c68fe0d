//! Frame buffer for accumulating partial reads.
//!
//! Uses `bytes::BytesMut` for zero-copy buffer management. The buffered
//! tail is the pending fragment: bytes that do not yet form a complete
//! frame. It is carried into the next [`FrameBuffer::push`], never dropped.
//!
//! - **Legacy**: a frame is everything up to and including the last NUL in
//!   the buffer; the rest waits for the next chunk.
//! - **Length-prefixed**: a state machine over
//!   `WaitingForHeader` (need 4 bytes) and `WaitingForPayload` (header
//!   parsed, need N payload bytes). A header split across chunks is
//!   buffered like any other partial data.
//!
//! After a framing error the stream position is lost. The buffer is then
//! corrupt and rejects every further push; a new connection needs a new
//! buffer.
//!
//! # Example
//!
//! ```
//! use tws_wire::protocol::{build_frame, FrameBuffer, ProtocolMode};
//!
//! let mut buffer = FrameBuffer::new(ProtocolMode::LengthPrefixed);
//! let bytes = build_frame(b"176\x00").unwrap();
//!
//! assert!(buffer.push(&bytes[..2]).unwrap().is_empty());
//! let frames = buffer.push(&bytes[2..]).unwrap();
//! assert_eq!(frames[0].tokens().unwrap(), vec!["176"]);
//! ```

use bytes::BytesMut;

use super::wire_format::{
    decode_length, validate_length, ProtocolMode, DEFAULT_MAX_PAYLOAD_SIZE, DELIMITER,
    LENGTH_HEADER_SIZE,
};
use super::Frame;
use crate::error::{Result, WireError};

/// State machine for length-prefixed parsing.
#[derive(Debug, Clone, Copy)]
enum State {
    /// Waiting for a complete 4-byte header.
    WaitingForHeader,
    /// Header validated (still buffered), waiting for `length` payload bytes.
    WaitingForPayload { length: usize },
}

/// Buffer for accumulating incoming bytes and extracting complete frames.
#[derive(Debug)]
pub struct FrameBuffer {
    /// Framing generation, fixed for the connection.
    mode: ProtocolMode,
    /// Accumulated bytes not yet emitted as a frame.
    buffer: BytesMut,
    /// Length-prefixed parsing state (unused in legacy mode).
    state: State,
    /// Maximum allowed payload size.
    max_payload_size: u32,
    /// Set by the first framing error.
    corrupt: bool,
}

impl FrameBuffer {
    /// Create a new frame buffer with the default payload limit.
    pub fn new(mode: ProtocolMode) -> Self {
        Self::with_max_payload(mode, DEFAULT_MAX_PAYLOAD_SIZE)
    }

    /// Create a new frame buffer with a custom payload limit.
    pub fn with_max_payload(mode: ProtocolMode, max_payload_size: u32) -> Self {
        Self {
            mode,
            buffer: BytesMut::with_capacity(16 * 1024),
            state: State::WaitingForHeader,
            max_payload_size,
            corrupt: false,
        }
    }

    /// Push a chunk into the buffer and extract all complete frames.
    ///
    /// Frames come back in stream order. Partial data is kept for the next
    /// push.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::Framing`] if a declared length (or an
    /// unterminated legacy fragment) exceeds the payload limit. The buffer
    /// is cleared and marked corrupt: the stream cannot be resynchronised,
    /// so every later push fails too.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Frame>> {
        if self.corrupt {
            return Err(WireError::Framing(format!(
                "Stream is corrupt, dropping {} bytes",
                data.len()
            )));
        }

        self.buffer.extend_from_slice(data);

        let result = match self.mode {
            ProtocolMode::Legacy => self.extract_legacy(),
            ProtocolMode::LengthPrefixed => self.extract_length_prefixed(),
        };

        if result.is_err() {
            self.clear();
            self.corrupt = true;
        }
        result
    }

    fn extract_legacy(&mut self) -> Result<Vec<Frame>> {
        let Some(last) = self.buffer.iter().rposition(|&b| b == DELIMITER) else {
            if self.buffer.len() > self.max_payload_size as usize {
                return Err(WireError::Framing(format!(
                    "Unterminated message of {} bytes exceeds maximum {}",
                    self.buffer.len(),
                    self.max_payload_size
                )));
            }
            return Ok(Vec::new());
        };

        let payload = self.buffer.split_to(last + 1).freeze();
        Ok(vec![Frame::legacy(payload)])
    }

    fn extract_length_prefixed(&mut self) -> Result<Vec<Frame>> {
        let mut frames = Vec::new();
        while let Some(frame) = self.try_extract_one()? {
            frames.push(frame);
        }
        Ok(frames)
    }

    /// Try to extract a single length-prefixed frame.
    ///
    /// Returns:
    /// - `Ok(Some(frame))` if a complete frame was extracted
    /// - `Ok(None)` if more data is needed
    /// - `Err(...)` if the declared length is out of bounds
    fn try_extract_one(&mut self) -> Result<Option<Frame>> {
        match self.state {
            State::WaitingForHeader => {
                let Some(length) = decode_length(&self.buffer) else {
                    return Ok(None);
                };
                validate_length(length, self.max_payload_size)?;

                self.state = State::WaitingForPayload {
                    length: length as usize,
                };
                self.try_extract_one()
            }

            State::WaitingForPayload { length } => {
                let total = LENGTH_HEADER_SIZE + length;
                if self.buffer.len() < total {
                    return Ok(None);
                }

                let raw = self.buffer.split_to(total).freeze();
                self.state = State::WaitingForHeader;

                Ok(Some(Frame::length_prefixed(raw)))
            }
        }
    }

    /// Get the framing mode.
    pub fn mode(&self) -> ProtocolMode {
        self.mode
    }

    /// Get the number of buffered (pending) bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// The pending fragment.
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    /// Check if a framing error has made the stream unusable.
    pub fn is_corrupt(&self) -> bool {
        self.corrupt
    }

    /// Clear the buffer and reset state.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.state = State::WaitingForHeader;
    }

    #[cfg(test)]
    fn state_name(&self) -> &'static str {
        match self.state {
            State::WaitingForHeader => "WaitingForHeader",
            State::WaitingForPayload { .. } => "WaitingForPayload",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::build_frame;

    fn lp(payload: &[u8]) -> Vec<u8> {
        build_frame(payload).unwrap()
    }

    #[test]
    fn test_single_complete_frame() {
        let mut buffer = FrameBuffer::new(ProtocolMode::LengthPrefixed);

        let frames = buffer.push(&lp(b"4\x002\x00")).unwrap();

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].tokens().unwrap(), vec!["4", "2"]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_multiple_frames_in_one_push() {
        let mut buffer = FrameBuffer::new(ProtocolMode::LengthPrefixed);

        let mut combined = lp(b"first\x00");
        combined.extend(lp(b"second\x00"));
        combined.extend(lp(b"third\x00"));

        let frames = buffer.push(&combined).unwrap();

        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].tokens().unwrap(), vec!["first"]);
        assert_eq!(frames[1].tokens().unwrap(), vec!["second"]);
        assert_eq!(frames[2].tokens().unwrap(), vec!["third"]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_fragmented_header_is_buffered() {
        let mut buffer = FrameBuffer::new(ProtocolMode::LengthPrefixed);
        let bytes = lp(b"test\x00");

        assert!(buffer.push(&bytes[..1]).unwrap().is_empty());
        assert!(buffer.push(&bytes[1..3]).unwrap().is_empty());
        assert_eq!(buffer.state_name(), "WaitingForHeader");
        assert_eq!(buffer.len(), 3);

        let frames = buffer.push(&bytes[3..]).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload(), b"test\x00");
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_fragmented_payload() {
        let mut buffer = FrameBuffer::new(ProtocolMode::LengthPrefixed);
        let payload = b"this is a longer payload\x00that will be fragmented\x00";
        let bytes = lp(payload);

        let partial = LENGTH_HEADER_SIZE + 10;
        assert!(buffer.push(&bytes[..partial]).unwrap().is_empty());
        assert_eq!(buffer.state_name(), "WaitingForPayload");

        let frames = buffer.push(&bytes[partial..]).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload(), payload);
        assert_eq!(&frames[0].raw[..], &bytes[..]);
    }

    #[test]
    fn test_empty_payload() {
        let mut buffer = FrameBuffer::new(ProtocolMode::LengthPrefixed);

        let frames = buffer.push(&lp(b"")).unwrap();

        assert_eq!(frames.len(), 1);
        assert!(frames[0].payload().is_empty());
        assert!(frames[0].tokens().unwrap().is_empty());
    }

    #[test]
    fn test_max_payload_validation() {
        let mut buffer = FrameBuffer::with_max_payload(ProtocolMode::LengthPrefixed, 100);

        let result = buffer.push(&1000u32.to_be_bytes());

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("exceeds maximum"));
        assert!(buffer.is_empty());
        assert_eq!(buffer.state_name(), "WaitingForHeader");
    }

    #[test]
    fn test_corrupt_stream_rejects_later_chunks() {
        let mut buffer = FrameBuffer::with_max_payload(ProtocolMode::LengthPrefixed, 100);

        assert!(buffer.push(&1000u32.to_be_bytes()).is_err());
        assert!(buffer.is_corrupt());

        // A well-formed frame cannot be trusted to sit on a boundary any more.
        let result = buffer.push(&lp(b"ok\x00"));
        assert!(matches!(result, Err(WireError::Framing(_))));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_mixed_complete_and_partial() {
        let mut buffer = FrameBuffer::new(ProtocolMode::LengthPrefixed);
        let frame1 = lp(b"first\x00");
        let frame2 = lp(b"second\x00");

        let mut data = frame1.clone();
        data.extend_from_slice(&frame2[..6]);

        let frames = buffer.push(&data).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(buffer.pending(), &frame2[..6]);

        let frames = buffer.push(&frame2[6..]).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].tokens().unwrap(), vec!["second"]);
    }

    #[test]
    fn test_byte_at_a_time() {
        let mut buffer = FrameBuffer::new(ProtocolMode::LengthPrefixed);
        let bytes = lp(b"hi\x00");

        let mut all_frames = Vec::new();
        for byte in &bytes {
            all_frames.extend(buffer.push(&[*byte]).unwrap());
        }

        assert_eq!(all_frames.len(), 1);
        assert_eq!(all_frames[0].payload(), b"hi\x00");
    }

    #[test]
    fn test_clear_resets_state() {
        let mut buffer = FrameBuffer::new(ProtocolMode::LengthPrefixed);
        let bytes = lp(b"test\x00");

        buffer.push(&bytes[..LENGTH_HEADER_SIZE + 1]).unwrap();
        assert_eq!(buffer.state_name(), "WaitingForPayload");

        buffer.clear();

        assert_eq!(buffer.state_name(), "WaitingForHeader");
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_legacy_complete_chunk() {
        let mut buffer = FrameBuffer::new(ProtocolMode::Legacy);

        let frames = buffer.push(b"176\x0020240101 09:30:00 EST\x00").unwrap();

        assert_eq!(frames.len(), 1);
        assert_eq!(
            frames[0].tokens().unwrap(),
            vec!["176", "20240101 09:30:00 EST"]
        );
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_legacy_fragment_is_prefixed_to_next_chunk() {
        let mut buffer = FrameBuffer::new(ProtocolMode::Legacy);

        let frames = buffer.push(b"9\x001\x00123").unwrap();
        assert_eq!(frames[0].tokens().unwrap(), vec!["9", "1"]);
        assert_eq!(buffer.pending(), b"123");

        let frames = buffer.push(b"45\x00").unwrap();
        assert_eq!(frames[0].tokens().unwrap(), vec!["12345"]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_legacy_chunk_without_delimiter() {
        let mut buffer = FrameBuffer::new(ProtocolMode::Legacy);

        assert!(buffer.push(b"partial").unwrap().is_empty());
        assert!(buffer.push(b"").unwrap().is_empty());
        assert_eq!(buffer.pending(), b"partial");
    }

    #[test]
    fn test_legacy_unterminated_fragment_limit() {
        let mut buffer = FrameBuffer::with_max_payload(ProtocolMode::Legacy, 4);

        let result = buffer.push(b"12345");

        assert!(matches!(result, Err(WireError::Framing(_))));
        assert!(buffer.is_empty());
    }
}
