//! Unified error type for coop-relay.

use coop_relay_protocol::ProtocolError;
use coop_relay_room::RoomError;
use coop_relay_session::SessionError;
use coop_relay_transport::TransportError;

/// Top-level error that wraps every layer's error type.
///
/// The `#[from]` conversions let `?` lift a sub-crate error straight into
/// a `RelayError`.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// A transport-level error (accept, send, recv, timeout).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A client-registry error.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A room error.
    #[error(transparent)]
    Room(#[from] RoomError),
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use coop_relay_protocol::{ClientId, RoomId};

    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::SendTimedOut(Duration::from_secs(30));
        let relay_err: RelayError = err.into();
        assert!(matches!(relay_err, RelayError::Transport(_)));
        assert!(relay_err.to_string().contains("30s"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidMessage("bad".into());
        let relay_err: RelayError = err.into();
        assert!(matches!(relay_err, RelayError::Protocol(_)));
    }

    #[test]
    fn test_from_session_error() {
        let err = SessionError::UnknownClient(ClientId(3));
        let relay_err: RelayError = err.into();
        assert!(matches!(relay_err, RelayError::Session(_)));
    }

    #[test]
    fn test_from_room_error() {
        let err = RoomError::NotFound(RoomId(1));
        let relay_err: RelayError = err.into();
        assert!(matches!(relay_err, RelayError::Room(_)));
    }
}
