//! Error types for the room layer.

use coop_relay_protocol::{ClientId, RoomId};

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room does not exist.
    #[error("room {0} not found")]
    NotFound(RoomId),

    /// The client is not a member of this room.
    #[error("client {0} not in room {1}")]
    NotMember(ClientId, RoomId),
}
