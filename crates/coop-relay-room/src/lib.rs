//! Room management for coop-relay.
//!
//! A room is a named group of clients. Packets from one member are fanned
//! out to the others, and the room keeps the queue of members waiting for
//! someone to push a save state.
//!
//! # Key types
//!
//! - [`Room`] — membership, fan-out, and the pending save-state queue
//! - [`RoomManager`] — one room per name, created on first reference
//! - [`SaveStateStatus`] — whether a room has outstanding requests

mod error;
mod manager;
mod room;

pub use error::RoomError;
pub use manager::RoomManager;
pub use room::{Room, SaveStateStatus};
