//! Wire protocol for coop-relay.
//!
//! This crate defines what travels between clients and the relay:
//!
//! - **Types** ([`Packet`], [`Envelope`], [`Payload`], [`ClientId`], ...) —
//!   the packet model, decoded through the `type` discriminator.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how packets become bytes.
//! - **Framing** ([`FrameBuffer`], [`encode_frame`], [`decode_frame`]) —
//!   how those bytes are delimited on the stream (one NUL after each
//!   JSON object).
//! - **Errors** ([`ProtocolError`]).
//!
//! ```text
//! Transport (byte chunks) → Framing (frames) → Codec (Packet) → Router
//! ```

mod codec;
mod error;
pub mod framing;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use framing::{FRAME_DELIMITER, FrameBuffer, decode_frame, encode_frame, sanitize};
pub use types::{
    AllClientData, ClientData, ClientId, Envelope, Fields, Packet, PacketType, Payload,
    Recipient, RoomId, ServerMessage, UpdateClientData,
};
