//! Property-based tests for framing.
//!
//! These tests verify framing invariants hold for arbitrary inputs:
//!
//! - Any chunking of an encoded stream reassembles to the same messages
//! - Field encoding and decoding round-trip
//! - Oversized length headers are always rejected

use proptest::prelude::*;
use proptest::sample::Index;

use super::{decode_tokens, FrameBuffer, ProtocolMode, LENGTH_HEADER_SIZE};
use crate::codec::{Message, TokenCodec, Value};

/// A field as the gateway would send it: printable, never a NUL.
fn field() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 .:+-]{0,12}"
}

fn message() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(field(), 1..6)
}

/// Cut `data` at arbitrary points.
fn split<'a>(data: &'a [u8], cuts: &[Index]) -> Vec<&'a [u8]> {
    let mut points: Vec<usize> = cuts.iter().map(|i| i.index(data.len() + 1)).collect();
    points.sort_unstable();
    points.dedup();

    let mut chunks = Vec::new();
    let mut start = 0;
    for point in points {
        chunks.push(&data[start..point]);
        start = point;
    }
    chunks.push(&data[start..]);
    chunks
}

// ==================== Reassembly Property Tests ====================

proptest! {
    /// Length-prefixed frames survive any chunking, header splits included.
    #[test]
    fn length_prefixed_any_chunking(
        messages in prop::collection::vec(message(), 1..8),
        cuts in prop::collection::vec(any::<Index>(), 0..12)
    ) {
        let mut wire = Vec::new();
        for fields in &messages {
            wire.extend_from_slice(&TokenCodec::encode_length_prefixed(fields).unwrap());
        }

        let mut buffer = FrameBuffer::new(ProtocolMode::LengthPrefixed);
        let mut decoded = Vec::new();
        for chunk in split(&wire, &cuts) {
            for frame in buffer.push(chunk).unwrap() {
                decoded.push(frame.tokens().unwrap());
            }
        }

        prop_assert_eq!(decoded, messages);
        prop_assert!(buffer.is_empty());
    }

    /// Legacy chunking never loses, reorders or splits a field.
    #[test]
    fn legacy_any_chunking(
        messages in prop::collection::vec(message(), 1..8),
        cuts in prop::collection::vec(any::<Index>(), 0..12)
    ) {
        let mut wire = Vec::new();
        for fields in &messages {
            wire.extend_from_slice(&TokenCodec::encode_payload(fields));
        }

        let mut buffer = FrameBuffer::new(ProtocolMode::Legacy);
        let mut decoded = Vec::new();
        for chunk in split(&wire, &cuts) {
            for frame in buffer.push(chunk).unwrap() {
                decoded.extend(frame.tokens().unwrap());
            }
        }

        let expected: Vec<String> = messages.into_iter().flatten().collect();
        prop_assert_eq!(decoded, expected);
        prop_assert!(buffer.is_empty());
    }

    /// A header split at any point is held until complete.
    #[test]
    fn header_split_is_buffered(fields in message(), at in 1usize..LENGTH_HEADER_SIZE) {
        let wire = TokenCodec::encode_length_prefixed(&fields).unwrap();

        let mut buffer = FrameBuffer::new(ProtocolMode::LengthPrefixed);
        prop_assert!(buffer.push(&wire[..at]).unwrap().is_empty());
        prop_assert_eq!(buffer.len(), at);

        let frames = buffer.push(&wire[at..]).unwrap();
        prop_assert_eq!(frames.len(), 1);
        prop_assert_eq!(frames[0].tokens().unwrap(), fields);
    }

    /// Declared lengths above the limit are rejected and the buffer reset.
    #[test]
    fn oversized_length_rejected(max in 0u32..1024, extra in 1u32..1024) {
        let mut buffer = FrameBuffer::with_max_payload(ProtocolMode::LengthPrefixed, max);

        let result = buffer.push(&(max + extra).to_be_bytes());

        prop_assert!(result.is_err());
        prop_assert!(buffer.is_empty());
    }
}

// ==================== Encoding Property Tests ====================

proptest! {
    /// Decoding an encoded payload gives back the fields.
    #[test]
    fn payload_roundtrip(fields in prop::collection::vec(field(), 0..10)) {
        let payload = TokenCodec::encode_payload(&fields);
        prop_assert_eq!(decode_tokens(&payload).unwrap(), fields);
    }

    /// Booleans come back as their digit form.
    #[test]
    fn booleans_normalized(flags in prop::collection::vec(any::<bool>(), 1..10)) {
        let message: Message = flags.iter().copied().map(Value::from).collect();
        let payload = TokenCodec::encode_payload(&message.fields());

        let expected: Vec<String> = flags
            .iter()
            .map(|b| if *b { "1".to_string() } else { "0".to_string() })
            .collect();
        prop_assert_eq!(decode_tokens(&payload).unwrap(), expected);
    }

    /// Numbers round-trip through their decimal text.
    #[test]
    fn integers_roundtrip(values in prop::collection::vec(any::<i64>(), 1..10)) {
        let message: Message = values.iter().copied().map(Value::from).collect();
        let tokens = decode_tokens(&TokenCodec::encode_payload(&message.fields())).unwrap();

        let parsed: Vec<i64> = tokens.iter().map(|t| t.parse().unwrap()).collect();
        prop_assert_eq!(parsed, values);
    }
}
