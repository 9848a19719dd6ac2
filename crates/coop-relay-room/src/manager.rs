//! Room manager: one room per name, created on first reference.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use coop_relay_protocol::{ClientId, RoomId};

use crate::Room;

/// Counter for generating unique room IDs.
static NEXT_ROOM_ID: AtomicU64 = AtomicU64::new(1);

/// Owns every room, indexed by id and by name.
///
/// Rooms are never removed, even once they are empty. Like the client
/// registry this type is not thread-safe; callers serialize access.
#[derive(Debug, Default)]
pub struct RoomManager {
    /// Rooms keyed by their generated id.
    rooms: HashMap<RoomId, Room>,

    /// Join key → room id. Exactly one entry per distinct name.
    names: HashMap<String, RoomId>,
}

impl RoomManager {
    /// Creates an empty room manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the room called `name`, creating it if this is the first
    /// time the name has been seen.
    ///
    /// Lookup and creation happen under one `&mut self` borrow, so two
    /// joins on the same name can never produce two rooms.
    pub fn get_or_create(&mut self, name: &str) -> &mut Room {
        let room_id = match self.names.get(name) {
            Some(&room_id) => room_id,
            None => {
                let room_id = RoomId(NEXT_ROOM_ID.fetch_add(1, Ordering::Relaxed));
                self.names.insert(name.to_owned(), room_id);
                tracing::info!(%room_id, room = name, "room created");
                room_id
            }
        };
        self.rooms
            .entry(room_id)
            .or_insert_with(|| Room::new(room_id, name.to_owned()))
    }

    /// Looks up a room by id.
    pub fn get(&self, room_id: RoomId) -> Option<&Room> {
        self.rooms.get(&room_id)
    }

    /// Looks up a room by id for mutation.
    pub fn get_mut(&mut self, room_id: RoomId) -> Option<&mut Room> {
        self.rooms.get_mut(&room_id)
    }

    /// Looks up a room by name without creating it.
    pub fn get_by_name(&self, name: &str) -> Option<&Room> {
        self.names.get(name).and_then(|id| self.rooms.get(id))
    }

    /// Finds the room whose member list contains `client_id`.
    ///
    /// This scans every room; callers that already know the client's
    /// cached room should use [`get`](Self::get) instead.
    pub fn room_containing(&self, client_id: ClientId) -> Option<&Room> {
        self.rooms.values().find(|room| room.contains(client_id))
    }

    /// Returns the number of rooms ever created.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Iterates over every room.
    pub fn rooms(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }
}
