//! Error types for the session layer.

use coop_relay_protocol::ClientId;

/// Errors that can occur while tracking connected clients.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A client with this id is already registered.
    #[error("client {0} is already registered")]
    AlreadyConnected(ClientId),

    /// No client with this id is registered.
    #[error("client {0} not found")]
    UnknownClient(ClientId),
}
