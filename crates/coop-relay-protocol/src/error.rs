//! Error types for the protocol layer.

/// Errors that can occur while encoding or decoding packets.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// Deserialization failed: malformed JSON, a missing `type`, or
    /// fields that don't match the declared packet type.
    #[error("decode failed: {0}")]
    Decode(#[source] serde_json::Error),

    /// The message is structurally valid JSON but not a packet.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
