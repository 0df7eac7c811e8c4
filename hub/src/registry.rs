use crate::connection::ConnectionId;
use crate::room::RoomId;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Room -> members mapping. Owned by the hub control loop; nothing else mutates it.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: HashMap<RoomId, HashSet<ConnectionId>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the member was not already present. Creates the room on first join.
    pub fn add_member(&mut self, room: &RoomId, id: &ConnectionId) -> bool {
        self.rooms.entry(room.clone()).or_default().insert(id.clone())
    }

    /// Returns true if the member was present. Deletes the room once empty.
    pub fn remove_member(&mut self, room: &RoomId, id: &ConnectionId) -> bool {
        let Some(members) = self.rooms.get_mut(room) else {
            return false;
        };
        let removed = members.remove(id);
        if members.is_empty() {
            self.rooms.remove(room);
        }
        removed
    }

    /// Snapshot of a room's members at this instant.
    pub fn members(&self, room: &RoomId) -> Vec<ConnectionId> {
        self.rooms
            .get(room)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn is_member(&self, room: &RoomId, id: &ConnectionId) -> bool {
        self.rooms
            .get(room)
            .is_some_and(|members| members.contains(id))
    }

    pub fn contains_room(&self, room: &RoomId) -> bool {
        self.rooms.contains_key(room)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Per-room member counts, ordered by room id.
    pub fn member_counts(&self) -> BTreeMap<String, usize> {
        self.rooms
            .iter()
            .map(|(room, members)| (room.to_string(), members.len()))
            .collect()
    }
}
