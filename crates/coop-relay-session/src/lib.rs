//! Connected-client tracking for coop-relay.
//!
//! A [`Client`] is the server's record of one connection: its id, the
//! channel its writer task drains, the last state snapshot it pushed,
//! and the room it currently belongs to. The [`ClientRegistry`] owns
//! every record.
//!
//! # How it fits in the stack
//!
//! ```text
//! Room Layer (above)      ← holds ClientSenders for fan-out
//!     ↕
//! Session Layer (this)    ← client identity, outbound channel, snapshot
//!     ↕
//! Protocol Layer (below)  ← ClientId, RoomId, ClientData
//! ```

mod client;
mod error;
mod manager;

pub use client::{Client, ClientSender, OutboundReceiver, outbound_channel};
pub use error::SessionError;
pub use manager::ClientRegistry;
