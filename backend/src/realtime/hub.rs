//! Per-user broadcast rooms
//!
//! Every signed-in user has one room, `user_{id}`. Sockets subscribe to the
//! room after `join_room`; services publish into it without knowing how many
//! sockets (if any) are listening.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use shared::{ServerEvent, UserId};
use tokio::sync::broadcast;

/// Registry of live rooms
#[derive(Clone)]
pub struct RoomHub {
    rooms: Arc<RwLock<HashMap<String, broadcast::Sender<ServerEvent>>>>,
    capacity: usize,
}

impl RoomHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            rooms: Arc::new(RwLock::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, broadcast::Sender<ServerEvent>>> {
        match self.rooms.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, broadcast::Sender<ServerEvent>>> {
        match self.rooms.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Subscribe to a user's room, creating it on first join
    pub fn join(&self, user_id: UserId) -> broadcast::Receiver<ServerEvent> {
        let room = user_id.room();
        if let Some(sender) = self.read().get(&room) {
            return sender.subscribe();
        }

        let mut rooms = self.write();
        rooms
            .entry(room)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Send an event to everyone in the user's room
    ///
    /// Returns how many sockets received it. Zero when nobody is listening.
    pub fn publish(&self, user_id: UserId, event: ServerEvent) -> usize {
        let room = user_id.room();
        match self.read().get(&room) {
            Some(sender) => sender.send(event).unwrap_or(0),
            None => 0,
        }
    }

    /// Drop the user's room once its last receiver is gone
    pub fn prune(&self, user_id: UserId) {
        let room = user_id.room();
        let mut rooms = self.write();
        if rooms
            .get(&room)
            .is_some_and(|sender| sender.receiver_count() == 0)
        {
            rooms.remove(&room);
            tracing::debug!(room = %room, "Pruned empty room");
        }
    }

    pub fn room_count(&self) -> usize {
        self.read().len()
    }

    pub fn listeners(&self, user_id: UserId) -> usize {
        self.read()
            .get(&user_id.room())
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }
}
