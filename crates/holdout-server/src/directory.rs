//! The session directory: which rooms exist and which room each
//! connection belongs to.
//!
//! Owned exclusively by the coordinator task, so no locking. The two maps
//! are kept in step by `bind`/`unbind`; a connection is in at most one
//! room at a time.

use std::collections::HashMap;

use holdout_game::Room;
use holdout_protocol::{ConnectionId, RoomCode};
use rand::Rng;

#[derive(Debug, Default)]
pub struct SessionDirectory {
    rooms: HashMap<RoomCode, Room>,
    members: HashMap<ConnectionId, RoomCode>,
}

impl SessionDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draws room codes until one is unused. With a 36^6 code space and a
    /// handful of live rooms, collisions are vanishingly rare but still
    /// handled.
    pub fn allocate_code<R: Rng + ?Sized>(&self, rng: &mut R) -> RoomCode {
        loop {
            let code = RoomCode::generate(rng);
            if !self.rooms.contains_key(&code) {
                return code;
            }
        }
    }

    pub fn insert_room(&mut self, room: Room) {
        self.rooms.insert(room.code().clone(), room);
    }

    pub fn room_mut(&mut self, code: &RoomCode) -> Option<&mut Room> {
        self.rooms.get_mut(code)
    }

    pub fn remove_room(&mut self, code: &RoomCode) -> Option<Room> {
        self.rooms.remove(code)
    }

    /// Points a connection at a room. Any previous binding is replaced.
    pub fn bind(&mut self, conn: ConnectionId, code: RoomCode) {
        self.members.insert(conn, code);
    }

    /// Drops a connection's binding, returning the room code it had.
    pub fn unbind(&mut self, conn: ConnectionId) -> Option<RoomCode> {
        self.members.remove(&conn)
    }

    pub fn room_of(&self, conn: ConnectionId) -> Option<&RoomCode> {
        self.members.get(&conn)
    }

    /// The room the connection is bound to, if both halves still exist.
    pub fn room_for(&mut self, conn: ConnectionId) -> Option<&mut Room> {
        let code = self.members.get(&conn)?;
        self.rooms.get_mut(code)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Codes of rooms whose round timer has expired, for the sweep.
    pub fn expired_rooms(&self, now_ms: u64) -> Vec<RoomCode> {
        self.rooms
            .values()
            .filter(|room| room.round_expired(now_ms))
            .map(|room| room.code().clone())
            .collect()
    }
}
