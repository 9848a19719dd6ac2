//! # coop-relay
//!
//! Room-based packet relay for cooperative multiplayer games.
//!
//! Clients connect over TCP and exchange JSON packets, each terminated by
//! a single NUL byte. A packet's `roomId` puts the sender in a named room,
//! a `targetClientId` sends it to one room-mate, and otherwise its `type`
//! decides what happens: state snapshots are stored, scene flags and items
//! are fanned out to the room, and save states are requested from and
//! pushed between room-mates.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use coop_relay::prelude::*;
//!
//! # async fn run() -> Result<(), RelayError> {
//! let server = RelayServer::builder()
//!     .bind("0.0.0.0:8080")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod registry;
pub mod router;
mod server;

pub use config::ServerConfig;
pub use error::RelayError;
pub use registry::Registry;
pub use server::{RelayHandle, RelayServer, RelayServerBuilder};

pub use coop_relay_protocol as protocol;
pub use coop_relay_room as room;
pub use coop_relay_session as session;
pub use coop_relay_transport as transport;

/// Everything needed to run a relay or speak its wire format.
pub mod prelude {
    pub use crate::router::{NO_PEERS_MESSAGE, SAVE_STATE_REQUESTED_MESSAGE};
    pub use crate::{RelayError, RelayHandle, RelayServer, RelayServerBuilder, ServerConfig};
    pub use coop_relay_protocol::{
        ClientId, Codec, Envelope, FRAME_DELIMITER, FrameBuffer, JsonCodec, Packet,
        PacketType, Payload, ProtocolError, RoomId, decode_frame, encode_frame,
    };
}
