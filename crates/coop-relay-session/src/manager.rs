//! The client registry: every connected client, keyed by id.
//!
//! `ClientRegistry` is not thread-safe by itself. The server keeps it
//! behind the same lock as the room manager so that membership changes
//! touch both sides together.

use std::collections::HashMap;
use std::net::SocketAddr;

use coop_relay_protocol::{ClientData, ClientId, RoomId};

use crate::{Client, ClientSender, SessionError};

/// Owns the record of every connected client.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: HashMap<ClientId, Client>,
}

impl ClientRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a newly accepted client.
    ///
    /// # Errors
    /// Returns [`SessionError::AlreadyConnected`] if the id is taken.
    pub fn register(
        &mut self,
        sender: ClientSender,
        peer_addr: Option<SocketAddr>,
    ) -> Result<&Client, SessionError> {
        let client_id = sender.client_id();
        if self.clients.contains_key(&client_id) {
            return Err(SessionError::AlreadyConnected(client_id));
        }

        tracing::info!(%client_id, ?peer_addr, "client registered");
        Ok(self
            .clients
            .entry(client_id)
            .or_insert_with(|| Client::new(sender, peer_addr)))
    }

    /// Removes a client and returns its record.
    ///
    /// Dropping the record drops the client's sender, which lets its
    /// writer task finish.
    ///
    /// # Errors
    /// Returns [`SessionError::UnknownClient`] if it isn't registered.
    pub fn remove(&mut self, client_id: ClientId) -> Result<Client, SessionError> {
        let client = self
            .clients
            .remove(&client_id)
            .ok_or(SessionError::UnknownClient(client_id))?;
        tracing::info!(%client_id, "client deregistered");
        Ok(client)
    }

    /// Looks up a client by id.
    pub fn get(&self, client_id: ClientId) -> Option<&Client> {
        self.clients.get(&client_id)
    }

    /// Returns `true` if a client with this id is registered.
    pub fn contains(&self, client_id: ClientId) -> bool {
        self.clients.contains_key(&client_id)
    }

    /// Replaces a client's state snapshot.
    ///
    /// # Errors
    /// Returns [`SessionError::UnknownClient`] if it isn't registered.
    pub fn update_data(
        &mut self,
        client_id: ClientId,
        data: ClientData,
    ) -> Result<(), SessionError> {
        let client = self
            .clients
            .get_mut(&client_id)
            .ok_or(SessionError::UnknownClient(client_id))?;
        client.data = data;
        Ok(())
    }

    /// Records which room a client belongs to (or none).
    ///
    /// # Errors
    /// Returns [`SessionError::UnknownClient`] if it isn't registered.
    pub fn set_room(
        &mut self,
        client_id: ClientId,
        room: Option<RoomId>,
    ) -> Result<(), SessionError> {
        let client = self
            .clients
            .get_mut(&client_id)
            .ok_or(SessionError::UnknownClient(client_id))?;
        client.room = room;
        Ok(())
    }

    /// The room a client belongs to, if it is registered and in one.
    pub fn room_of(&self, client_id: ClientId) -> Option<RoomId> {
        self.clients.get(&client_id).and_then(|c| c.room)
    }

    /// Returns the number of registered clients.
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Returns `true` if no clients are registered.
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Iterates over every registered client.
    pub fn iter(&self) -> impl Iterator<Item = &Client> {
        self.clients.values()
    }
}
