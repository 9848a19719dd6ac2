//! The per-connection client record and its outbound channel.

use std::net::SocketAddr;

use bytes::Bytes;
use coop_relay_protocol::{ClientData, ClientId, RoomId};
use tokio::sync::mpsc;

/// Receiving end of a client's outbound channel, drained by its writer.
pub type OutboundReceiver = mpsc::UnboundedReceiver<Bytes>;

/// Creates the outbound channel for one client.
pub fn outbound_channel(client_id: ClientId) -> (ClientSender, OutboundReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ClientSender { client_id, tx }, rx)
}

/// Queues encoded frames for delivery to one client.
///
/// Cheap to clone. Frames are [`Bytes`], so a broadcast encodes once and
/// every recipient shares the same buffer.
#[derive(Debug, Clone)]
pub struct ClientSender {
    client_id: ClientId,
    tx: mpsc::UnboundedSender<Bytes>,
}

impl ClientSender {
    /// The client this sender delivers to.
    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    /// Queues a frame. Returns `false` if the client's writer is gone,
    /// in which case the frame is dropped.
    pub fn send(&self, frame: Bytes) -> bool {
        if self.tx.send(frame).is_err() {
            tracing::debug!(
                client_id = %self.client_id,
                "writer gone, dropping frame"
            );
            return false;
        }
        true
    }

    /// Returns `true` once the receiving side has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// The server's record of one connected client.
#[derive(Debug)]
pub struct Client {
    /// Identity, derived from the transport's connection id.
    pub id: ClientId,

    /// Where the client connected from.
    pub peer_addr: Option<SocketAddr>,

    /// Last state snapshot the client pushed with `UPDATE_CLIENT_DATA`.
    pub data: ClientData,

    /// The room the client belongs to, mirrored by that room's member
    /// list. Only the registry changes it.
    pub room: Option<RoomId>,

    sender: ClientSender,
}

impl Client {
    /// Creates a record for a freshly accepted connection.
    pub fn new(sender: ClientSender, peer_addr: Option<SocketAddr>) -> Self {
        Self {
            id: sender.client_id(),
            peer_addr,
            data: ClientData::new(),
            room: None,
            sender,
        }
    }

    /// The channel frames for this client are queued on.
    pub fn sender(&self) -> &ClientSender {
        &self.sender
    }

    /// Queues a frame for this client.
    pub fn send(&self, frame: Bytes) -> bool {
        self.sender.send(frame)
    }
}
