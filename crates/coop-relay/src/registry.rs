//! The shared context every connection works against.
//!
//! [`Registry`] owns the client registry and the room manager side by
//! side. The server keeps one behind a single `tokio::sync::Mutex`, so a
//! join or leave updates the client's cached room and the room's member
//! list in the same critical section, and create-or-fetch of a room can
//! never race with itself.

use std::net::SocketAddr;

use coop_relay_protocol::{ClientData, ClientId, RoomId};
use coop_relay_room::{Room, RoomError, RoomManager};
use coop_relay_session::{Client, ClientRegistry, ClientSender, SessionError};

use crate::RelayError;

/// All connected clients and all rooms.
#[derive(Debug, Default)]
pub struct Registry {
    clients: ClientRegistry,
    rooms: RoomManager,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a freshly accepted connection.
    pub fn register(
        &mut self,
        sender: ClientSender,
        peer_addr: Option<SocketAddr>,
    ) -> Result<(), RelayError> {
        self.clients.register(sender, peer_addr)?;
        Ok(())
    }

    /// Removes a client from its room (and that room's pending queue) and
    /// then from the registry.
    pub fn deregister(&mut self, client_id: ClientId) -> Result<Client, RelayError> {
        self.leave_room(client_id)?;
        Ok(self.clients.remove(client_id)?)
    }

    /// Puts a client in the room called `name`, creating the room if
    /// needed. A client already in a room stays where it is.
    ///
    /// Returns the id of the room the client ends up in.
    pub fn join_room(
        &mut self,
        client_id: ClientId,
        name: &str,
    ) -> Result<RoomId, RelayError> {
        let client = self
            .clients
            .get(client_id)
            .ok_or(SessionError::UnknownClient(client_id))?;
        if let Some(current) = client.room {
            return Ok(current);
        }
        let sender = client.sender().clone();

        let room = self.rooms.get_or_create(name);
        room.add_member(sender);
        let room_id = room.id();
        self.clients.set_room(client_id, Some(room_id))?;
        Ok(room_id)
    }

    /// Takes a client out of its room. Returns the room it left, if any.
    pub fn leave_room(&mut self, client_id: ClientId) -> Result<Option<RoomId>, RelayError> {
        let Some(room_id) = self.clients.room_of(client_id) else {
            return Ok(None);
        };
        self.rooms
            .get_mut(room_id)
            .ok_or(RoomError::NotFound(room_id))?
            .remove_member(client_id);
        self.clients.set_room(client_id, None)?;
        Ok(Some(room_id))
    }

    /// Replaces a client's stored state snapshot.
    pub fn update_client_data(
        &mut self,
        client_id: ClientId,
        data: ClientData,
    ) -> Result<(), RelayError> {
        Ok(self.clients.update_data(client_id, data)?)
    }

    /// Looks up a client by id.
    pub fn client(&self, client_id: ClientId) -> Option<&Client> {
        self.clients.get(client_id)
    }

    /// The room a client is in, via its cached room id.
    pub fn room_of(&self, client_id: ClientId) -> Option<&Room> {
        self.clients
            .room_of(client_id)
            .and_then(|room_id| self.rooms.get(room_id))
    }

    pub(crate) fn room_of_mut(&mut self, client_id: ClientId) -> Option<&mut Room> {
        self.clients
            .room_of(client_id)
            .and_then(|room_id| self.rooms.get_mut(room_id))
    }

    /// The room a client is in, found by scanning every room's members.
    pub fn room_containing(&self, client_id: ClientId) -> Option<&Room> {
        self.rooms.room_containing(client_id)
    }

    /// Looks up a room by name without creating it.
    pub fn room_by_name(&self, name: &str) -> Option<&Room> {
        self.rooms.get_by_name(name)
    }

    /// Every connected client.
    pub fn clients(&self) -> &ClientRegistry {
        &self.clients
    }

    /// Every room.
    pub fn rooms(&self) -> &RoomManager {
        &self.rooms
    }
}
