use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use tokio::sync::mpsc::{self, error::TrySendError};

use super::events::ServerMessage;

pub type Outbound = mpsc::Sender<ServerMessage>;

/// Fan-out of events to the connections joined to a room (one room per chat).
///
/// Calls never wait: implementations hand the event to each member's queue
/// and return. The in-process [`LocalRooms`] only reaches connections held by
/// this process; a deployment with several relay instances would put a
/// pub/sub backed implementation here instead.
pub trait RoomBroadcaster: Send + Sync {
    fn join(&self, room_id: &str, connection_id: &str, outbound: Outbound);

    fn leave(&self, room_id: &str, connection_id: &str);

    /// Drops the connection from every room it joined.
    fn disconnect(&self, connection_id: &str);

    /// Returns how many connections the event was queued for.
    fn publish(&self, room_id: &str, payload: ServerMessage) -> usize;

    fn close_room(&self, room_id: &str);
}

#[derive(Default)]
struct RoomTable {
    members: HashMap<String, HashMap<String, Outbound>>,
    memberships: HashMap<String, HashSet<String>>,
}

impl RoomTable {
    fn remove_member(&mut self, room_id: &str, connection_id: &str) {
        if let Some(room) = self.members.get_mut(room_id) {
            room.remove(connection_id);
            if room.is_empty() {
                self.members.remove(room_id);
            }
        }

        if let Some(rooms) = self.memberships.get_mut(connection_id) {
            rooms.remove(room_id);
            if rooms.is_empty() {
                self.memberships.remove(connection_id);
            }
        }
    }
}

#[derive(Default)]
pub struct LocalRooms {
    table: RwLock<RoomTable>,
}

impl LocalRooms {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn member_count(&self, room_id: &str) -> usize {
        self.read().members.get(room_id).map_or(0, HashMap::len)
    }

    pub fn rooms_of(&self, connection_id: &str) -> Vec<String> {
        self.read()
            .memberships
            .get(connection_id)
            .map(|rooms| rooms.iter().cloned().collect())
            .unwrap_or_default()
    }

    // A panic while holding the lock leaves the table consistent, so a
    // poisoned lock is still usable.
    fn read(&self) -> std::sync::RwLockReadGuard<'_, RoomTable> {
        self.table.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, RoomTable> {
        self.table.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl RoomBroadcaster for LocalRooms {
    fn join(&self, room_id: &str, connection_id: &str, outbound: Outbound) {
        let mut table = self.write();
        table
            .members
            .entry(room_id.to_string())
            .or_default()
            .insert(connection_id.to_string(), outbound);
        table
            .memberships
            .entry(connection_id.to_string())
            .or_default()
            .insert(room_id.to_string());
    }

    fn leave(&self, room_id: &str, connection_id: &str) {
        self.write().remove_member(room_id, connection_id);
    }

    fn disconnect(&self, connection_id: &str) {
        let mut table = self.write();
        let rooms = table.memberships.remove(connection_id).unwrap_or_default();
        for room_id in rooms {
            table.remove_member(&room_id, connection_id);
        }
    }

    fn publish(&self, room_id: &str, payload: ServerMessage) -> usize {
        let mut delivered = 0;
        let mut closed = Vec::new();

        {
            let table = self.read();
            let Some(room) = table.members.get(room_id) else {
                return 0;
            };

            for (connection_id, outbound) in room {
                match outbound.try_send(payload.clone()) {
                    Ok(()) => delivered += 1,
                    Err(TrySendError::Full(_)) => {
                        tracing::warn!(
                            room_id,
                            connection_id = %connection_id,
                            "Outbound queue full, dropping event"
                        );
                    }
                    Err(TrySendError::Closed(_)) => closed.push(connection_id.clone()),
                }
            }
        }

        if !closed.is_empty() {
            let mut table = self.write();
            for connection_id in closed {
                table.remove_member(room_id, &connection_id);
            }
        }

        delivered
    }

    fn close_room(&self, room_id: &str) {
        let mut table = self.write();
        let members: Vec<String> = table
            .members
            .get(room_id)
            .map(|room| room.keys().cloned().collect())
            .unwrap_or_default();
        for connection_id in members {
            table.remove_member(room_id, &connection_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue() -> (Outbound, mpsc::Receiver<ServerMessage>) {
        mpsc::channel(8)
    }

    #[test]
    fn test_publish_reaches_every_member_of_the_room() {
        let rooms = LocalRooms::new();
        let (a_tx, mut a_rx) = queue();
        let (b_tx, mut b_rx) = queue();
        let (c_tx, mut c_rx) = queue();

        rooms.join("chat-1", "a", a_tx);
        rooms.join("chat-1", "b", b_tx);
        rooms.join("chat-2", "c", c_tx);

        assert_eq!(rooms.publish("chat-1", ServerMessage::Pong), 2);
        assert!(matches!(a_rx.try_recv(), Ok(ServerMessage::Pong)));
        assert!(matches!(b_rx.try_recv(), Ok(ServerMessage::Pong)));
        assert!(c_rx.try_recv().is_err());
    }

    #[test]
    fn test_connection_can_sit_in_several_rooms() {
        let rooms = LocalRooms::new();
        let (tx, mut rx) = queue();

        rooms.join("chat-1", "a", tx.clone());
        rooms.join("chat-2", "a", tx);

        let mut joined = rooms.rooms_of("a");
        joined.sort();
        assert_eq!(joined, vec!["chat-1", "chat-2"]);

        rooms.publish("chat-1", ServerMessage::Pong);
        rooms.publish("chat-2", ServerMessage::Pong);
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn test_leave_and_disconnect() {
        let rooms = LocalRooms::new();
        let (tx, _rx) = queue();

        rooms.join("chat-1", "a", tx.clone());
        rooms.join("chat-2", "a", tx);

        rooms.leave("chat-1", "a");
        assert_eq!(rooms.member_count("chat-1"), 0);
        assert_eq!(rooms.member_count("chat-2"), 1);

        rooms.disconnect("a");
        assert_eq!(rooms.member_count("chat-2"), 0);
        assert!(rooms.rooms_of("a").is_empty());
    }

    #[test]
    fn test_closed_queues_are_pruned() {
        let rooms = LocalRooms::new();
        let (tx, rx) = queue();
        rooms.join("chat-1", "a", tx);
        drop(rx);

        assert_eq!(rooms.publish("chat-1", ServerMessage::Pong), 0);
        assert_eq!(rooms.member_count("chat-1"), 0);
    }

    #[test]
    fn test_full_queue_drops_without_blocking() {
        let rooms = LocalRooms::new();
        let (tx, mut rx) = mpsc::channel(1);
        rooms.join("chat-1", "a", tx);

        assert_eq!(rooms.publish("chat-1", ServerMessage::Pong), 1);
        assert_eq!(rooms.publish("chat-1", ServerMessage::Pong), 0);
        assert_eq!(rooms.member_count("chat-1"), 1);
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_close_room() {
        let rooms = LocalRooms::new();
        let (tx, _rx) = queue();
        rooms.join("chat-1", "a", tx.clone());
        rooms.join("chat-2", "a", tx);

        rooms.close_room("chat-1");
        assert_eq!(rooms.member_count("chat-1"), 0);
        assert_eq!(rooms.rooms_of("a"), vec!["chat-2"]);
    }
}
