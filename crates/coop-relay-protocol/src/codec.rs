//! Codec trait and the JSON implementation.
//!
//! A codec only turns values into bytes and back. Delimiting those bytes
//! on the stream is the job of the [`framing`](crate::framing) module.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes Rust values to bytes and decodes bytes back.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or
    /// don't match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// A [`Codec`] that uses compact JSON (via `serde_json`).
///
/// ```rust
/// use coop_relay_protocol::{Codec, JsonCodec, Packet};
///
/// let codec = JsonCodec;
/// let packet = Packet::server_message("Save State Requested");
///
/// let bytes = codec.encode(&packet).unwrap();
/// let decoded: Packet = codec.decode(&bytes).unwrap();
/// assert_eq!(packet, decoded);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
