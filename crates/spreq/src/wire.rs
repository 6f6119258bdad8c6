// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Correlation tag codec.
//!
//! Every request carries a 4-byte big-endian tag in front of the application
//! payload, and every reply is expected to echo it:
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-------------------------------------------------------------+
//! |1|                    request id (31 bits)                     |
//! +-+-------------------------------------------------------------+
//! |                      payload (N bytes) ...                    |
//! ```
//!
//! The top bit marks the frame as a tagged request/reply; frames without it
//! belong to other frame kinds of the protocol family. The raw socket treats
//! the whole tagged buffer as opaque payload.

use std::fmt;

/// Size of the correlation tag on the wire.
pub const TAG_LEN: usize = 4;

/// Marker bit set in every request/reply tag.
pub const REQUEST_MARKER: u32 = 0x8000_0000;

/// Bits of the tag that carry the comparable request ID.
pub const ID_MASK: u32 = 0x7fff_ffff;

/// Write `value` big-endian into the first 4 bytes of `buf`.
///
/// # Panics
/// If `buf` is shorter than 4 bytes.
#[inline]
pub fn put_u32(buf: &mut [u8], value: u32) {
    buf[..4].copy_from_slice(&value.to_be_bytes());
}

/// Read a big-endian `u32` from the first 4 bytes of `buf`.
///
/// # Panics
/// If `buf` is shorter than 4 bytes.
#[inline]
pub fn get_u32(buf: &[u8]) -> u32 {
    u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]])
}

/// 31-bit request identifier.
///
/// Unique per request from one socket's point of view only. The marker bit is
/// never part of the value, so two IDs compare equal exactly when their wire
/// tags do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct RequestId(u32);

impl RequestId {
    /// Create an ID from any `u32`, discarding bit 31.
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw & ID_MASK)
    }

    /// The 31-bit value.
    #[inline]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Next ID in sequence, wrapping modulo 2^31.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self::new(self.0.wrapping_add(1))
    }

    /// Wire tag for this ID (marker bit set).
    #[inline]
    pub const fn tag(self) -> u32 {
        self.0 | REQUEST_MARKER
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// Reasons an inbound frame is not a usable reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// Frame is shorter than the tag (carries the actual length).
    TooShort(usize),
    /// Tag lacks the request/reply marker (carries the raw tag).
    Unmarked(u32),
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort(len) => write!(f, "frame too short: {} bytes", len),
            Self::Unmarked(tag) => write!(f, "tag {:#010x} missing request marker", tag),
        }
    }
}

/// Build a tagged request frame: `[tag][payload]`.
pub fn encode_request(id: RequestId, payload: &[u8]) -> Box<[u8]> {
    let mut frame = vec![0u8; TAG_LEN + payload.len()];
    put_u32(&mut frame, id.tag());
    frame[TAG_LEN..].copy_from_slice(payload);
    frame.into_boxed_slice()
}

/// Split a reply frame into its request ID and payload.
pub fn decode_reply(frame: &[u8]) -> Result<(RequestId, &[u8]), FrameError> {
    if frame.len() < TAG_LEN {
        return Err(FrameError::TooShort(frame.len()));
    }

    let tag = get_u32(frame);
    if tag & REQUEST_MARKER == 0 {
        return Err(FrameError::Unmarked(tag));
    }

    Ok((RequestId::new(tag), &frame[TAG_LEN..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn big_endian_helpers() {
        let mut buf = [0u8; 6];
        put_u32(&mut buf, 0x0102_0304);
        assert_eq!(&buf[..4], &[1, 2, 3, 4]);
        assert_eq!(get_u32(&buf), 0x0102_0304);
    }

    #[test]
    fn id_is_masked_to_31_bits() {
        assert_eq!(RequestId::new(0xffff_ffff).get(), 0x7fff_ffff);
        assert_eq!(RequestId::new(0x8000_0005).get(), 5);
    }

    #[test]
    fn id_wraps_at_2_pow_31() {
        assert_eq!(RequestId::new(ID_MASK).next(), RequestId::new(0));
        assert_eq!(RequestId::new(41).next().get(), 42);
    }

    #[test]
    fn tag_sets_marker() {
        assert_eq!(RequestId::new(0).tag(), 0x8000_0000);
        assert_eq!(RequestId::new(0x1234).tag(), 0x8000_1234);
    }

    #[test]
    fn request_layout() {
        let frame = encode_request(RequestId::new(0x0a0b_0c0d), b"ping");
        assert_eq!(&frame[..], &[0x8a, 0x0b, 0x0c, 0x0d, b'p', b'i', b'n', b'g']);
    }

    #[test]
    fn empty_payload_is_tag_only() {
        let frame = encode_request(RequestId::new(7), b"");
        assert_eq!(frame.len(), TAG_LEN);
        let (id, body) = decode_reply(&frame).unwrap();
        assert_eq!(id.get(), 7);
        assert!(body.is_empty());
    }

    #[test]
    fn decode_rejects_short_frames() {
        assert_eq!(decode_reply(&[]), Err(FrameError::TooShort(0)));
        assert_eq!(decode_reply(&[0x80, 0, 0]), Err(FrameError::TooShort(3)));
    }

    #[test]
    fn decode_rejects_unmarked_tag() {
        assert_eq!(
            decode_reply(&[0x00, 0, 0, 9, b'x']),
            Err(FrameError::Unmarked(9))
        );
    }

    #[test]
    fn display_is_hex() {
        assert_eq!(RequestId::new(255).to_string(), "0x000000ff");
        assert!(FrameError::Unmarked(1).to_string().contains("marker"));
    }
}
