//! NUL-delimited framing.
//!
//! On the wire each packet is its JSON text followed by one `0x00` byte.
//! There is no length prefix, so the receive side accumulates whatever
//! the socket hands it in a [`FrameBuffer`] and cuts a frame at every
//! delimiter, keeping the tail for the next read.

use bytes::{BufMut, Bytes, BytesMut};
use memchr::memchr;
use serde::{Serialize, de::DeserializeOwned};

use crate::{Codec, ProtocolError};

/// The byte that terminates every frame.
pub const FRAME_DELIMITER: u8 = 0x00;

/// Accumulates received bytes and splits them into frames.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    buf: BytesMut,
}

impl FrameBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty buffer with room for `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    /// Appends newly received bytes after whatever is still buffered.
    pub fn extend(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Removes and returns the next complete frame, without its delimiter.
    ///
    /// Returns `None` when no delimiter is buffered; the partial frame
    /// stays put until more bytes arrive.
    pub fn next_frame(&mut self) -> Option<Bytes> {
        let end = memchr(FRAME_DELIMITER, &self.buf)?;
        let mut frame = self.buf.split_to(end + 1);
        frame.truncate(end);
        Some(frame.freeze())
    }

    /// Iterates over every complete frame currently buffered.
    pub fn frames(&mut self) -> impl Iterator<Item = Bytes> + '_ {
        std::iter::from_fn(move || self.next_frame())
    }

    /// Number of bytes waiting for a delimiter.
    pub fn pending_len(&self) -> usize {
        self.buf.len()
    }

    /// Returns `true` if nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

/// Cleans a raw frame before it is parsed.
///
/// Trailing NUL bytes are stripped, then every byte outside printable
/// ASCII (other than tab, CR and LF) is dropped. The result is always
/// valid UTF-8.
pub fn sanitize(frame: &[u8]) -> String {
    let end = frame
        .iter()
        .rposition(|&b| b != FRAME_DELIMITER)
        .map_or(0, |i| i + 1);
    frame[..end]
        .iter()
        .copied()
        .filter(|&b| matches!(b, 0x20..=0x7E | b'\t' | b'\r' | b'\n'))
        .map(char::from)
        .collect()
}

/// Encodes `value` and appends the frame delimiter.
pub fn encode_frame<C: Codec, T: Serialize>(
    codec: &C,
    value: &T,
) -> Result<Bytes, ProtocolError> {
    let body = codec.encode(value)?;
    let mut frame = BytesMut::with_capacity(body.len() + 1);
    frame.extend_from_slice(&body);
    frame.put_u8(FRAME_DELIMITER);
    Ok(frame.freeze())
}

/// Sanitizes one frame (delimiter already removed) and decodes it.
pub fn decode_frame<C: Codec, T: DeserializeOwned>(
    codec: &C,
    frame: &[u8],
) -> Result<T, ProtocolError> {
    let text = sanitize(frame);
    codec.decode(text.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{JsonCodec, Packet, Payload};

    const STREAM: &[u8] =
        b"{\"type\":\"HEARTBEAT\"}\0{\"type\":\"GAME_COMPLETE\",\"roomId\":\"r\"}\0\0{\"type\":\"GIVE_ITEM\",\"item\":7}\0{\"type\":";

    fn frames_for(chunks: &[&[u8]]) -> (Vec<Bytes>, usize) {
        let mut buffer = FrameBuffer::new();
        let mut out = Vec::new();
        for chunk in chunks {
            buffer.extend(chunk);
            out.extend(buffer.frames());
        }
        (out, buffer.pending_len())
    }

    #[test]
    fn test_single_read_yields_every_complete_frame() {
        let (frames, pending) = frames_for(&[STREAM]);
        assert_eq!(frames.len(), 4);
        assert_eq!(&frames[0][..], b"{\"type\":\"HEARTBEAT\"}");
        assert!(frames[2].is_empty(), "back-to-back delimiters give an empty frame");
        assert_eq!(pending, b"{\"type\":".len());
    }

    #[test]
    fn test_any_two_way_split_matches_single_read() {
        let (expected, expected_pending) = frames_for(&[STREAM]);
        for cut in 0..=STREAM.len() {
            let (head, tail) = STREAM.split_at(cut);
            let (frames, pending) = frames_for(&[head, tail]);
            assert_eq!(frames, expected, "split at {cut}");
            assert_eq!(pending, expected_pending);
        }
    }

    #[test]
    fn test_byte_at_a_time_matches_single_read() {
        let (expected, _) = frames_for(&[STREAM]);
        let chunks: Vec<&[u8]> = STREAM.chunks(1).collect();
        let (frames, _) = frames_for(&chunks);
        assert_eq!(frames, expected);
    }

    #[test]
    fn test_partial_frame_completes_on_later_read() {
        let mut buffer = FrameBuffer::new();
        buffer.extend(b"{\"type\":\"HEART");
        assert!(buffer.next_frame().is_none());
        assert_eq!(buffer.pending_len(), 14);

        buffer.extend(b"BEAT\"}\0{");
        assert_eq!(
            buffer.next_frame().as_deref(),
            Some(&b"{\"type\":\"HEARTBEAT\"}"[..])
        );
        assert!(buffer.next_frame().is_none());
        assert_eq!(buffer.pending_len(), 1);
    }

    #[test]
    fn test_sanitize_strips_trailing_nuls_and_control_bytes() {
        assert_eq!(sanitize(b"{\"a\":1}\0\0"), "{\"a\":1}");
        assert_eq!(sanitize(b"\x01{\"a\":\x7f1}\x1b"), "{\"a\":1}");
        assert_eq!(sanitize(b"{\"a\":\t\r\n1}"), "{\"a\":\t\r\n1}");
    }

    #[test]
    fn test_sanitize_drops_non_ascii_bytes() {
        assert_eq!(sanitize("{\"name\":\"Zoë\"}".as_bytes()), "{\"name\":\"Zo\"}");
        assert_eq!(sanitize(b""), "");
        assert_eq!(sanitize(b"\0\0"), "");
    }

    #[test]
    fn test_encode_frame_appends_single_delimiter() {
        let frame = encode_frame(&JsonCodec, &Packet::server_message("x")).unwrap();
        assert_eq!(frame.last(), Some(&FRAME_DELIMITER));
        assert_eq!(
            frame.iter().filter(|&&b| b == FRAME_DELIMITER).count(),
            1
        );
    }

    #[test]
    fn test_encoded_frame_decodes_to_equal_packet() {
        let packet = Packet::new(Payload::SetSceneFlag(
            serde_json::json!({"scene": 4, "flag": 2}).as_object().cloned().unwrap(),
        ))
        .with_room("castle");

        let mut buffer = FrameBuffer::new();
        buffer.extend(&encode_frame(&JsonCodec, &packet).unwrap());
        let frame = buffer.next_frame().expect("one frame");
        let decoded: Packet = decode_frame(&JsonCodec, &frame).unwrap();

        assert_eq!(decoded, packet);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_decode_frame_tolerates_stray_control_bytes() {
        let decoded: Packet =
            decode_frame(&JsonCodec, b"\x02{\"type\":\"HEARTBEAT\"}\x03").unwrap();
        assert_eq!(decoded.type_name(), "HEARTBEAT");
    }

    #[test]
    fn test_decode_frame_rejects_empty_and_malformed_frames() {
        assert!(decode_frame::<_, Packet>(&JsonCodec, b"").is_err());
        assert!(decode_frame::<_, Packet>(&JsonCodec, b"{\"type\":").is_err());
    }
}
