//! A single room: its members and its pending save-state queue.

use bytes::Bytes;
use coop_relay_protocol::{ClientId, Recipient, RoomId};
use coop_relay_session::ClientSender;

use crate::RoomError;

/// Save-state request state of a room.
///
/// ```text
///   Idle ──(REQUEST_SAVE_STATE, ≥2 members)──→ Requested
///    ↑                                            │
///    └─────────────(PUSH_SAVE_STATE)──────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStateStatus {
    /// Nobody is waiting for a save state.
    Idle,
    /// At least one member is waiting for a save state.
    Requested,
}

/// A named group of clients.
///
/// Members are kept in join order and are unique. The pending queue keeps
/// request order and may hold the same client more than once.
#[derive(Debug)]
pub struct Room {
    id: RoomId,
    name: String,
    members: Vec<ClientSender>,
    pending: Vec<ClientSender>,
}

impl Room {
    pub(crate) fn new(id: RoomId, name: String) -> Self {
        Self {
            id,
            name,
            members: Vec::new(),
            pending: Vec::new(),
        }
    }

    /// The id generated when the room was created.
    pub fn id(&self) -> RoomId {
        self.id
    }

    /// The name clients join the room by.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds a member. Returns `false` (and changes nothing) if the client
    /// is already in the room.
    pub fn add_member(&mut self, sender: ClientSender) -> bool {
        let client_id = sender.client_id();
        if self.contains(client_id) {
            return false;
        }
        self.members.push(sender);
        tracing::info!(
            room_id = %self.id,
            room = %self.name,
            %client_id,
            members = self.members.len(),
            "client joined room"
        );
        true
    }

    /// Removes a member along with any save-state requests it has queued.
    /// Returns `false` if the client wasn't a member.
    pub fn remove_member(&mut self, client_id: ClientId) -> bool {
        let before = self.members.len();
        self.members.retain(|m| m.client_id() != client_id);
        self.pending.retain(|m| m.client_id() != client_id);
        let removed = self.members.len() != before;
        if removed {
            tracing::info!(
                room_id = %self.id,
                room = %self.name,
                %client_id,
                members = self.members.len(),
                "client left room"
            );
        }
        removed
    }

    /// Returns `true` if the client is a member.
    pub fn contains(&self, client_id: ClientId) -> bool {
        self.members.iter().any(|m| m.client_id() == client_id)
    }

    /// Member ids in join order.
    pub fn member_ids(&self) -> Vec<ClientId> {
        self.members.iter().map(ClientSender::client_id).collect()
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns `true` if the room has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Queues `frame` for every member covered by `recipient`.
    ///
    /// Each member gets an independent send; a member whose writer is
    /// gone is skipped. Returns how many members the frame was queued for.
    pub fn broadcast(&self, frame: &Bytes, recipient: Recipient) -> usize {
        let delivered = self
            .members
            .iter()
            .filter(|m| recipient.includes(m.client_id()))
            .filter(|m| m.send(frame.clone()))
            .count();
        tracing::debug!(
            room_id = %self.id,
            ?recipient,
            delivered,
            "packet broadcast"
        );
        delivered
    }

    /// Queues `frame` for one member. Returns `false` if the client isn't
    /// a member or its writer is gone.
    pub fn send_to(&self, client_id: ClientId, frame: Bytes) -> bool {
        self.members
            .iter()
            .find(|m| m.client_id() == client_id)
            .is_some_and(|m| m.send(frame))
    }

    /// Appends a member to the pending save-state queue and returns the
    /// queue length. Repeated requests are queued again.
    ///
    /// # Errors
    /// Returns [`RoomError::NotMember`] if the client isn't in the room.
    pub fn queue_save_state_request(
        &mut self,
        client_id: ClientId,
    ) -> Result<usize, RoomError> {
        let sender = self
            .members
            .iter()
            .find(|m| m.client_id() == client_id)
            .cloned()
            .ok_or(RoomError::NotMember(client_id, self.id))?;
        self.pending.push(sender);
        Ok(self.pending.len())
    }

    /// Empties the pending queue and returns who was in it, in order.
    pub fn take_pending(&mut self) -> Vec<ClientSender> {
        std::mem::take(&mut self.pending)
    }

    /// Ids in the pending queue, in request order.
    pub fn pending_ids(&self) -> Vec<ClientId> {
        self.pending.iter().map(ClientSender::client_id).collect()
    }

    /// Whether anyone is waiting for a save state.
    pub fn save_state_status(&self) -> SaveStateStatus {
        if self.pending.is_empty() {
            SaveStateStatus::Idle
        } else {
            SaveStateStatus::Requested
        }
    }
}
